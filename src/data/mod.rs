pub mod document;
pub mod parser;

pub use document::{AnnotatedDocument, Annotation, MetaValue, TokenPosition, TokenStream};
pub use parser::parse_token_stream;
