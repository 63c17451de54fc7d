//! Projection of spans onto the extent of selected classes.

use crate::error::Result;
use crate::query::spans::{DocCursor, DocMatcher};
use crate::types::payload::strip_temporary;
use crate::types::{DocId, PositionSpan};

pub struct FocusMatcher {
    operand: DocCursor,
    classes: Vec<u8>,
    remove_temporary: bool,
    sorted: bool,
}

impl FocusMatcher {
    pub fn new(operand: DocCursor, classes: Vec<u8>, remove_temporary: bool, sorted: bool) -> Self {
        Self {
            operand,
            classes,
            remove_temporary,
            sorted,
        }
    }

    /// Smallest interval covering the selected class marks of `span`
    fn project(&self, span: PositionSpan) -> Option<PositionSpan> {
        let (start, end) = span
            .payload
            .iter()
            .filter_map(|entry| entry.as_class())
            .filter(|(id, _, _)| self.classes.contains(id))
            .fold(None, |acc: Option<(u32, u32)>, (_, s, e)| match acc {
                Some((start, end)) => Some((start.min(s), end.max(e))),
                None => Some((s, e)),
            })?;
        let payload = if self.remove_temporary {
            strip_temporary(&span.payload)
        } else {
            span.payload
        };
        Some(PositionSpan::with_payload(span.doc, start, end, payload))
    }
}

impl DocMatcher for FocusMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let Some(doc) = self.operand.seek(target)? else {
                return Ok(None);
            };
            let projected: Vec<PositionSpan> = self
                .operand
                .take_doc()?
                .into_iter()
                .filter_map(|span| self.project(span))
                .collect();
            if !projected.is_empty() {
                return Ok(Some(projected));
            }
            target = doc.saturating_add(1);
        }
    }

    fn cost(&self) -> u64 {
        self.operand.cost()
    }

    fn sorted(&self) -> bool {
        self.sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::spans::tests::{boxed, drain};
    use crate::query::spans::{BufferedSpans, SpanIterator};
    use crate::types::{PayloadEntry, TEMP_SOURCE_CLASS};

    fn marked(doc: DocId, start: u32, end: u32, marks: &[(u8, u32, u32)]) -> PositionSpan {
        PositionSpan::with_payload(
            doc,
            start,
            end,
            marks.iter().map(|(id, s, e)| PayloadEntry::class_mark(*id, *s, *e)).collect(),
        )
    }

    #[test]
    fn test_focus_on_union_of_classes() {
        let input = vec![
            marked(0, 0, 8, &[(1, 2, 3), (2, 5, 6)]),
            marked(0, 1, 4, &[(3, 1, 2)]),
            marked(1, 0, 4, &[(1, 3, 4)]),
        ];
        let focus = FocusMatcher::new(DocCursor::new(boxed(input)), vec![1, 2], true, true);
        assert_eq!(drain(Box::new(BufferedSpans::new(focus))), vec![(0, 2, 6), (1, 3, 4)]);
    }

    #[test]
    fn test_temporary_classes_are_removed_unless_kept() {
        let input = vec![marked(0, 0, 4, &[(TEMP_SOURCE_CLASS, 0, 1), (1, 2, 4)])];
        let focus = FocusMatcher::new(DocCursor::new(boxed(input.clone())), vec![TEMP_SOURCE_CLASS], true, true);
        let mut iter = BufferedSpans::new(focus);
        assert!(iter.next().unwrap());
        assert_eq!((iter.start().unwrap(), iter.end().unwrap()), (0, 1));
        assert_eq!(iter.payload().unwrap(), &[PayloadEntry::class_mark(1, 2, 4)]);

        let focus = FocusMatcher::new(DocCursor::new(boxed(input)), vec![TEMP_SOURCE_CLASS], false, true);
        let mut iter = BufferedSpans::new(focus);
        assert!(iter.next().unwrap());
        assert_eq!(iter.payload().unwrap().len(), 2);
    }

    #[test]
    fn test_unsorted_focus_keeps_operand_order() {
        let input = vec![marked(0, 0, 2, &[(1, 1, 2)]), marked(0, 1, 3, &[(1, 0, 1)])];
        let focus = FocusMatcher::new(DocCursor::new(boxed(input.clone())), vec![1], true, false);
        assert_eq!(drain(Box::new(BufferedSpans::new(focus))), vec![(0, 1, 2), (0, 0, 1)]);

        let focus = FocusMatcher::new(DocCursor::new(boxed(input)), vec![1], true, true);
        assert_eq!(drain(Box::new(BufferedSpans::new(focus))), vec![(0, 0, 1), (0, 1, 2)]);
    }
}
