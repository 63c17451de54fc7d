//! Per-segment document bitmask.
//!
//! Every composition step returns a new value; nothing is shared or mutated
//! behind another step's back.

use roaring::RoaringBitmap;

use crate::types::span::DocId;

#[derive(Debug, Clone, PartialEq)]
pub struct Bitmask {
    bits: RoaringBitmap,
    max_doc: u32,
}

impl Bitmask {
    /// No document set, sized for a segment of `max_doc` documents
    pub fn empty(max_doc: u32) -> Self {
        Self {
            bits: RoaringBitmap::new(),
            max_doc,
        }
    }

    /// Every document in `[0, max_doc)`
    pub fn full(max_doc: u32) -> Self {
        let mut bits = RoaringBitmap::new();
        bits.insert_range(0..max_doc);
        Self { bits, max_doc }
    }

    pub fn from_docs<I: IntoIterator<Item = DocId>>(max_doc: u32, docs: I) -> Self {
        let bits = docs.into_iter().filter(|d| *d < max_doc).collect();
        Self { bits, max_doc }
    }

    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    pub fn insert(&mut self, doc: DocId) {
        if doc < self.max_doc {
            self.bits.insert(doc);
        }
    }

    pub fn contains(&self, doc: DocId) -> bool {
        self.bits.contains(doc)
    }

    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn and(&self, other: &Bitmask) -> Bitmask {
        Bitmask {
            bits: &self.bits & &other.bits,
            max_doc: self.max_doc,
        }
    }

    pub fn or(&self, other: &Bitmask) -> Bitmask {
        Bitmask {
            bits: &self.bits | &other.bits,
            max_doc: self.max_doc.max(other.max_doc),
        }
    }

    pub fn and_not(&self, other: &Bitmask) -> Bitmask {
        Bitmask {
            bits: &self.bits - &other.bits,
            max_doc: self.max_doc,
        }
    }

    /// Documents of `[0, max_doc)` not in this mask
    pub fn complement(&self) -> Bitmask {
        Bitmask::full(self.max_doc).and_not(self)
    }

    /// First set document at or after `from`
    pub fn next_set(&self, from: DocId) -> Option<DocId> {
        let preceding = if from == 0 { 0 } else { self.bits.rank(from - 1) };
        let index = u32::try_from(preceding).ok()?;
        self.bits.select(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.bits.iter()
    }
}
