//! Concatenation: `A` immediately followed by `B`.

use crate::error::Result;
use crate::query::spans::{align, concat_payload, DocCursor, DocMatcher};
use crate::types::{DocId, PositionSpan};

pub struct NextMatcher {
    first: DocCursor,
    second: DocCursor,
}

impl NextMatcher {
    pub fn new(first: DocCursor, second: DocCursor) -> Self {
        Self { first, second }
    }
}

/// Every pair with `end(a) == start(b)`, spanning `start(a)..end(b)`
pub fn next_matches(first: &[PositionSpan], second: &[PositionSpan]) -> Vec<PositionSpan> {
    let mut by_start: Vec<&PositionSpan> = second.iter().collect();
    by_start.sort_by_key(|s| (s.start, s.end));

    let mut matches = Vec::new();
    for a in first {
        let from = by_start.partition_point(|b| b.start < a.end);
        for b in by_start[from..].iter().take_while(|b| b.start == a.end) {
            matches.push(PositionSpan::with_payload(
                a.doc,
                a.start,
                b.end,
                concat_payload(a, b),
            ));
        }
    }
    matches
}

impl DocMatcher for NextMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let Some(doc) = align(&mut [&mut self.first, &mut self.second], target)? else {
                return Ok(None);
            };
            let first = self.first.take_doc()?;
            let second = self.second.take_doc()?;
            let matches = next_matches(&first, &second);
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
    use crate::types::PayloadEntry;

    fn next_of(a: Vec<PositionSpan>, b: Vec<PositionSpan>) -> Vec<(DocId, u32, u32)> {
        let matcher = NextMatcher::new(DocCursor::new(boxed(a)), DocCursor::new(boxed(b)));
        drain(Box::new(BufferedSpans::new(matcher)))
    }

    #[test]
    fn test_adjacent_tokens() {
        // abcabcabac
        let a = spans(0, &[(0, 1), (3, 4), (6, 7), (8, 9)]);
        let b = spans(0, &[(1, 2), (4, 5), (7, 8)]);
        assert_eq!(next_of(a.clone(), b.clone()), vec![(0, 0, 2), (0, 3, 5), (0, 6, 8)]);
        assert_eq!(next_of(b, a), vec![(0, 7, 9)]);
    }

    #[test]
    fn test_every_second_span_at_boundary_matches() {
        let a = spans(0, &[(2, 3)]);
        let b = spans(0, &[(3, 4), (3, 7), (4, 5)]);
        assert_eq!(next_of(a, b), vec![(0, 2, 4), (0, 2, 7)]);
    }

    #[test]
    fn test_element_boundaries_are_exact() {
        // Element <>:x from 3 to 7, token c at 2 and b at 7
        let c = spans(0, &[(2, 3)]);
        let x = spans(0, &[(3, 7)]);
        let b = spans(0, &[(7, 8)]);
        assert_eq!(next_of(c, x.clone()), vec![(0, 2, 7)]);
        assert_eq!(next_of(x, b), vec![(0, 3, 8)]);
    }

    #[test]
    fn test_documents_must_agree() {
        let a: Vec<PositionSpan> = spans(0, &[(0, 1)]).into_iter().chain(spans(2, &[(1, 2)])).collect();
        let b: Vec<PositionSpan> = spans(1, &[(1, 2)]).into_iter().chain(spans(2, &[(2, 3)])).collect();
        assert_eq!(next_of(a, b), vec![(2, 1, 3)]);
    }

    #[test]
    fn test_payload_is_first_then_second() {
        let a = vec![PositionSpan::with_payload(0, 0, 1, vec![PayloadEntry::class_mark(1, 0, 1)])];
        let b = vec![PositionSpan::with_payload(0, 1, 2, vec![PayloadEntry::class_mark(2, 1, 2)])];
        let matches = next_matches(&a, &b);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].payload[0].as_class(), Some((1, 0, 1)));
        assert_eq!(matches[0].payload[1].as_class(), Some((2, 1, 2)));
    }
}
