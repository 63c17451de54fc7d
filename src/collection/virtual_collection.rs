//! Virtual collections: an ordered list of filter and extend steps evaluated
//! into a per-segment document bitmask.

use crate::collection::builder::{CollectionBuilder, GroupChild, Predicate};
use crate::collection::cache::CollectionCache;
use crate::error::Result;
use crate::storage::SegmentStorage;
use crate::types::Bitmask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Intersect with the documents selected so far
    Filter,
    /// Add to the documents selected so far
    Extend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOperation {
    pub predicate: Predicate,
    pub mode: FilterMode,
}

impl FilterOperation {
    pub fn filter(predicate: Predicate) -> Self {
        Self {
            predicate,
            mode: FilterMode::Filter,
        }
    }

    pub fn extend(predicate: Predicate) -> Self {
        Self {
            predicate,
            mode: FilterMode::Extend,
        }
    }
}

/// An empty collection covers every live document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    operations: Vec<FilterOperation>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_operations(operations: Vec<FilterOperation>) -> Self {
        Self { operations }
    }

    pub fn filter(&mut self, predicate: Predicate) -> &mut Self {
        self.operations.push(FilterOperation::filter(predicate));
        self
    }

    pub fn extend(&mut self, predicate: Predicate) -> &mut Self {
        self.operations.push(FilterOperation::extend(predicate));
        self
    }

    /// Restrict to any of the given documents. Unlike chaining `filter`
    /// calls, this selects the union.
    pub fn filter_uids(&mut self, uid_field: &str, uids: &[&str]) -> Result<&mut Self> {
        let cb = CollectionBuilder::new();
        let children: Vec<GroupChild> = uids.iter().map(|uid| cb.term(uid_field, uid).into()).collect();
        let group = cb.or_group(children)?;
        Ok(self.filter(group))
    }

    pub fn operations(&self) -> &[FilterOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Live documents of `segment` that belong to this collection
    pub fn bits(&self, segment: &dyn SegmentStorage, cache: &CollectionCache) -> Result<Bitmask> {
        let live = segment.live_docs();
        let Some((first, rest)) = self.operations.split_first() else {
            return Ok(live);
        };

        let mut acc = first.predicate.bits(segment, cache)?;
        log::trace!(
            "segment {}: initial {:?} selects {} docs",
            segment.segment_ord(),
            first.mode,
            acc.len()
        );
        for (step, operation) in rest.iter().enumerate() {
            let candidates = operation.predicate.bits(segment, cache)?;
            acc = match operation.mode {
                FilterMode::Extend => acc.or(&candidates),
                // A filter that selects nothing clears everything gathered so
                // far; only a later extend can bring documents back.
                FilterMode::Filter if candidates.is_empty() => Bitmask::empty(segment.max_doc()),
                FilterMode::Filter => acc.and(&candidates),
            };
            log::trace!(
                "segment {}: step {} {:?} with {} candidates leaves {} docs",
                segment.segment_ord(),
                step + 1,
                operation.mode,
                candidates.len(),
                acc.len()
            );
        }

        let bits = acc.and(&live);
        log::debug!(
            "segment {}: collection of {} steps selects {} of {} docs",
            segment.segment_ord(),
            self.operations.len(),
            bits.len(),
            segment.max_doc()
        );
        Ok(bits)
    }
}
