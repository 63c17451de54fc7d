use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::payload::PayloadEntry;

/// Segment-local document number
pub type DocId = u32;

/// A single match candidate: a token interval in one document plus payload.
///
/// `start` is inclusive, `end` exclusive, both counted in token positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionSpan {
    pub doc: DocId,
    pub start: u32,
    pub end: u32,
    pub payload: Vec<PayloadEntry>,
}

impl PositionSpan {
    pub fn new(doc: DocId, start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Self {
            doc,
            start,
            end,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(doc: DocId, start: u32, end: u32, payload: Vec<PayloadEntry>) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Self {
            doc,
            start,
            end,
            payload,
        }
    }

    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    /// Fully covers `other` (same document assumed)
    pub fn contains(&self, other: &PositionSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &PositionSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn same_position(&self, other: &PositionSpan) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Order used by every iterator: document, start, end, then payload
    pub fn position_cmp(&self, other: &PositionSpan) -> Ordering {
        self.doc
            .cmp(&other.doc)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }
}

impl PartialOrd for PositionSpan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PositionSpan {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position_cmp(other)
            .then_with(|| self.payload.cmp(&other.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containment_and_overlap() {
        let outer = PositionSpan::new(0, 2, 6);
        let inner = PositionSpan::new(0, 3, 5);
        let touching = PositionSpan::new(0, 6, 7);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.overlaps(&inner));
        assert!(!outer.overlaps(&touching));
        assert_eq!(outer.width(), 4);
    }

    #[test]
    fn test_ordering_by_doc_start_end() {
        let mut spans = vec![
            PositionSpan::new(1, 0, 1),
            PositionSpan::new(0, 3, 5),
            PositionSpan::new(0, 3, 4),
            PositionSpan::new(0, 1, 9),
        ];
        spans.sort();
        let order: Vec<(u32, u32, u32)> = spans.iter().map(|s| (s.doc, s.start, s.end)).collect();
        assert_eq!(order, vec![(0, 1, 9), (0, 3, 4), (0, 3, 5), (1, 0, 1)]);
    }
}
