pub mod offsets;
pub mod position_tokenizer;
pub mod posting_key;
pub mod segment;
pub mod term_spans;

pub use position_tokenizer::AnnotationTokenizer;
pub use posting_key::PostingKey;
pub use segment::TantivySegment;
