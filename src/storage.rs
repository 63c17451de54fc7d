//! The storage collaborator seen from the search core.
//!
//! A `SegmentStorage` is one immutable, independently searchable partition
//! of the index. The evaluator and the collection engine only talk to
//! storage through this trait.

use crate::error::Result;
use crate::query::spans::SpanIterator;
use crate::types::{Bitmask, DocId};

/// Field-level document predicate answered by storage directly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafPredicate {
    /// Exact value of a keyword field
    Term { field: String, value: String },
    /// Regular expression over the terms of a field
    Regex { field: String, pattern: String },
    /// Consecutive words of a tokenized text field
    Text { field: String, words: Vec<String> },
    /// Inclusive range over an integer or date field
    Range { field: String, lower: i64, upper: i64 },
    /// Matches no document
    Nothing,
}

pub trait SegmentStorage: Send + Sync {
    /// Position of this segment in the global result order
    fn segment_ord(&self) -> u32;

    /// Identity of the segment contents, stable for the segment's lifetime
    fn segment_key(&self) -> String;

    fn max_doc(&self) -> u32;

    /// Documents not deleted
    fn live_docs(&self) -> Bitmask;

    /// Spans of every occurrence of `term` in the annotated `field`
    fn postings(&self, field: &str, term: &str) -> Result<Box<dyn SpanIterator>>;

    fn doc_id_set(&self, predicate: &LeafPredicate) -> Result<Bitmask>;

    /// External identifier of a document
    fn doc_uid(&self, doc: DocId) -> Result<Option<String>>;

    /// Number of token positions of `field` in `doc`
    fn doc_length(&self, field: &str, doc: DocId) -> Result<u32>;

    /// Character offsets per token position, when they were supplied at indexing
    fn char_offsets(&self, field: &str, doc: DocId) -> Result<Option<Vec<(u32, u32)>>>;

    /// Per-document meta count of `unit` (`t`, `s`, `p`) for `field`
    fn doc_counts(&self, field: &str, unit: &str) -> Result<Vec<(DocId, u64)>>;
}
