//! Marks every operand span with a class id.

use crate::error::Result;
use crate::query::spans::{DocCursor, DocMatcher};
use crate::types::{DocId, PayloadEntry, PositionSpan};

pub struct ClassMatcher {
    operand: DocCursor,
    class_id: u8,
}

impl ClassMatcher {
    pub fn new(operand: DocCursor, class_id: u8) -> Self {
        Self { operand, class_id }
    }
}

impl DocMatcher for ClassMatcher {
    fn match_from(&mut self, target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        if self.operand.seek(target)?.is_none() {
            return Ok(None);
        }
        let mut spans = self.operand.take_doc()?;
        for span in spans.iter_mut() {
            span.payload
                .push(PayloadEntry::class_mark(self.class_id, span.start, span.end));
        }
        Ok(Some(spans))
    }

    fn cost(&self) -> u64 {
        self.operand.cost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::spans::tests::{boxed, spans};
    use crate::query::spans::{BufferedSpans, SpanIterator};

    #[test]
    fn test_class_mark_is_appended() {
        let mut iter = BufferedSpans::new(ClassMatcher::new(
            DocCursor::new(boxed(spans(3, &[(1, 4)]))),
            7,
        ));
        assert!(iter.next().unwrap());
        assert_eq!(iter.payload().unwrap(), &[PayloadEntry::class_mark(7, 1, 4)]);
        assert!(!iter.next().unwrap());
    }

    #[test]
    fn test_existing_payload_is_kept_before_the_mark() {
        let child = vec![
            PayloadEntry::class_mark(1, 2, 3),
            PayloadEntry::Attribute {
                key: "case".to_string(),
                value: "nom".to_string(),
            },
        ];
        let mut iter = BufferedSpans::new(ClassMatcher::new(
            DocCursor::new(boxed(vec![
                PositionSpan::with_payload(0, 2, 5, child.clone()),
                PositionSpan::with_payload(4, 0, 1, child[..1].to_vec()),
            ])),
            9,
        ));

        assert!(iter.next().unwrap());
        let payload = iter.payload().unwrap();
        assert_eq!(payload.len(), child.len() + 1);
        assert_eq!(&payload[..2], &child[..]);
        assert_eq!(payload.last(), Some(&PayloadEntry::class_mark(9, 2, 5)));

        assert!(iter.next().unwrap());
        assert_eq!((iter.doc().unwrap(), iter.start().unwrap()), (4, 0));
        assert_eq!(
            iter.payload().unwrap(),
            &[PayloadEntry::class_mark(1, 2, 3), PayloadEntry::class_mark(9, 0, 1)]
        );
        assert!(!iter.next().unwrap());
    }
}
