//! Spans of two operands occupying identical positions.

use crate::error::Result;
use crate::query::spans::{align, concat_payload, DocCursor, DocMatcher};
use crate::types::{DocId, PositionSpan};

pub struct SegmentMatcher {
    first: DocCursor,
    second: DocCursor,
}

impl SegmentMatcher {
    pub fn new(first: DocCursor, second: DocCursor) -> Self {
        Self { first, second }
    }
}

impl DocMatcher for SegmentMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let Some(doc) = align(&mut [&mut self.first, &mut self.second], target)? else {
                return Ok(None);
            };
            let first = self.first.take_doc()?;
            let second = self.second.take_doc()?;
            let mut matches = Vec::new();
            for a in &first {
                for b in second.iter().filter(|b| a.same_position(b)) {
                    matches.push(PositionSpan::with_payload(doc, a.start, a.end, concat_payload(a, b)));
                }
            }
            if !matches.is_empty() {
                return Ok(Some(matches));
            }
            target = doc.saturating_add(1);
        }
    }

    fn cost(&self) -> u64 {
        self.first.cost().min(self.second.cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::spans::tests::{boxed, drain, spans};
    use crate::query::spans::BufferedSpans;

    #[test]
    fn test_identical_positions_only() {
        // surface and lemma layers of the same token
        let surface = spans(0, &[(0, 1), (2, 3)]).into_iter().chain(spans(1, &[(4, 5)])).collect();
        let lemma = spans(0, &[(2, 3), (2, 4)]).into_iter().chain(spans(1, &[(4, 5)])).collect();
        let matcher = SegmentMatcher::new(DocCursor::new(boxed(surface)), DocCursor::new(boxed(lemma)));
        assert_eq!(drain(Box::new(BufferedSpans::new(matcher))), vec![(0, 2, 3), (1, 4, 5)]);
    }
}
