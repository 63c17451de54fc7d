//! Leaf span iterator over the postings of one term.
//!
//! A term may be stored under several posting keys (one per distinct end,
//! target or payload). The postings of all keys are merged document at a
//! time.

use tantivy::postings::{Postings, SegmentPostings};
use tantivy::{DocSet, TERMINATED};

use crate::engine::constants::ATTRIBUTE_PREFIX;
use crate::error::Result;
use crate::query::spans::DocMatcher;
use crate::tantivy_integration::posting_key::PostingKey;
use crate::types::{DocId, PayloadEntry, PositionSpan};

pub struct KeyedPostings {
    key: PostingKey,
    postings: SegmentPostings,
}

impl KeyedPostings {
    pub fn new(key: PostingKey, postings: SegmentPostings) -> Self {
        Self { key, postings }
    }

    pub fn key(&self) -> &PostingKey {
        &self.key
    }

    pub fn postings_mut(&mut self) -> &mut SegmentPostings {
        &mut self.postings
    }

    fn span(&self, doc: DocId, position: u32) -> PositionSpan {
        let end = self.key.end.unwrap_or(position + 1).max(position);
        let mut payload = Vec::new();
        if let Some((start, end)) = self.key.target {
            payload.push(PayloadEntry::RelationTarget { start, end });
        }
        if let Some(attribute) = self.key.term.strip_prefix(ATTRIBUTE_PREFIX) {
            let (key, value) = attribute.split_once('=').unwrap_or((attribute, ""));
            payload.push(PayloadEntry::Attribute {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        if let Some(bytes) = &self.key.raw {
            payload.push(PayloadEntry::Raw {
                bytes: bytes.clone(),
            });
        }
        PositionSpan::with_payload(doc, position, end, payload)
    }
}

pub struct TermPostings {
    keys: Vec<KeyedPostings>,
    positions: Vec<u32>,
}

impl TermPostings {
    pub fn new(keys: Vec<KeyedPostings>) -> Self {
        Self {
            keys,
            positions: Vec::new(),
        }
    }
}

impl DocMatcher for TermPostings {
    fn match_from(&mut self, target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        let mut doc = TERMINATED;
        for keyed in self.keys.iter_mut() {
            if keyed.postings.doc() < target {
                keyed.postings.seek(target);
            }
            doc = doc.min(keyed.postings.doc());
        }
        if doc == TERMINATED {
            return Ok(None);
        }
        let mut spans = Vec::new();
        for keyed in self.keys.iter_mut() {
            if keyed.postings.doc() != doc {
                continue;
            }
            self.positions.clear();
            keyed.postings.positions(&mut self.positions);
            spans.extend(self.positions.iter().map(|p| keyed.span(doc, *p)));
        }
        Ok(Some(spans))
    }

    fn cost(&self) -> u64 {
        self.keys.iter().map(|k| k.postings.size_hint() as u64).sum()
    }
}
