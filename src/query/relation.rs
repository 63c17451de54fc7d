//! Relations between two spans of the same document.
//!
//! A relation `>:label` is stored once at its source endpoint. The stored
//! posting spans the left endpoint and carries the right endpoint as a
//! relation target. The inverse `<:label` is stored at the target endpoint
//! in the same way, so a query can start from either side.
//!
//! `RelationMatcher` turns those postings into spans of the indexed
//! endpoint, marked with two classes: one for the left and one for the
//! right endpoint. `RelationMatchMatcher` additionally constrains both
//! endpoints with operand queries and emits the union of both endpoints.

use crate::error::Result;
use crate::query::node::RelationSpec;
use crate::query::spans::{align, DocCursor, DocMatcher};
use crate::types::{DocId, PayloadEntry, PositionSpan};

pub struct RelationMatcher {
    postings: DocCursor,
    spec: RelationSpec,
}

impl RelationMatcher {
    pub fn new(postings: DocCursor, spec: RelationSpec) -> Self {
        Self { postings, spec }
    }

    fn mark(&self, span: PositionSpan) -> Option<PositionSpan> {
        let (target_start, target_end) = span.payload.iter().find_map(|entry| match entry {
            PayloadEntry::RelationTarget { start, end } => Some((*start, *end)),
            _ => None,
        })?;
        let mut payload: Vec<PayloadEntry> = span
            .payload
            .into_iter()
            .filter(|entry| !matches!(entry, PayloadEntry::RelationTarget { .. }))
            .collect();
        payload.push(PayloadEntry::class_mark(self.spec.source_class, span.start, span.end));
        payload.push(PayloadEntry::class_mark(self.spec.target_class, target_start, target_end));
        Some(PositionSpan::with_payload(span.doc, span.start, span.end, payload))
    }
}

impl DocMatcher for RelationMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let Some(doc) = self.postings.seek(target)? else {
                return Ok(None);
            };
            let spans: Vec<PositionSpan> = self
                .postings
                .take_doc()?
                .into_iter()
                .filter_map(|span| {
                    let marked = self.mark(span);
                    if marked.is_none() {
                        log::debug!("relation {} without target in doc {}", self.spec.label, doc);
                    }
                    marked
                })
                .collect();
            if !spans.is_empty() {
                return Ok(Some(spans));
            }
            target = doc.saturating_add(1);
        }
    }

    fn cost(&self) -> u64 {
        self.postings.cost()
    }
}

/// Left and right endpoint of a span produced by `RelationMatcher`
fn endpoints(span: &PositionSpan, spec: &RelationSpec) -> Option<((u32, u32), (u32, u32))> {
    let [.., left, right] = span.payload.as_slice() else {
        return None;
    };
    match (left.as_class(), right.as_class()) {
        (Some((l, ls, le)), Some((r, rs, re))) if l == spec.source_class && r == spec.target_class => {
            Some(((ls, le), (rs, re)))
        }
        _ => None,
    }
}

pub struct RelationMatchMatcher {
    relations: DocCursor,
    spec: RelationSpec,
    source: Option<DocCursor>,
    target: Option<DocCursor>,
}

impl RelationMatchMatcher {
    pub fn new(
        relations: DocCursor,
        spec: RelationSpec,
        source: Option<DocCursor>,
        target: Option<DocCursor>,
    ) -> Self {
        Self {
            relations,
            spec,
            source,
            target,
        }
    }
}

/// Operand spans sitting exactly on `(start, end)`; `None` operand admits anything
fn on_endpoint<'a>(
    operand: &'a Option<Vec<PositionSpan>>,
    (start, end): (u32, u32),
) -> Option<Vec<&'a PositionSpan>> {
    match operand {
        None => None,
        Some(spans) => Some(
            spans
                .iter()
                .filter(|s| s.start == start && s.end == end)
                .collect(),
        ),
    }
}

pub fn relation_matches(
    relations: &[PositionSpan],
    spec: &RelationSpec,
    sources: &Option<Vec<PositionSpan>>,
    targets: &Option<Vec<PositionSpan>>,
) -> Vec<PositionSpan> {
    let mut matches = Vec::new();
    for relation in relations {
        let Some((left, right)) = endpoints(relation, spec) else {
            continue;
        };
        let source_options = on_endpoint(sources, left);
        let target_options = on_endpoint(targets, right);
        let source_list: Vec<Option<&PositionSpan>> = match &source_options {
            None => vec![None],
            Some(found) => found.iter().copied().map(Some).collect(),
        };
        let target_list: Vec<Option<&PositionSpan>> = match &target_options {
            None => vec![None],
            Some(found) => found.iter().copied().map(Some).collect(),
        };
        for source in &source_list {
            for target in &target_list {
                let mut payload = relation.payload.clone();
                if let Some(source) = source {
                    payload.extend(source.payload.iter().cloned());
                }
                if let Some(target) = target {
                    payload.extend(target.payload.iter().cloned());
                }
                matches.push(PositionSpan::with_payload(
                    relation.doc,
                    left.0.min(right.0),
                    left.1.max(right.1),
                    payload,
                ));
            }
        }
    }
    matches
}

impl DocMatcher for RelationMatchMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let doc = {
                let mut cursors: Vec<&mut DocCursor> = vec![&mut self.relations];
                cursors.extend(self.source.as_mut());
                cursors.extend(self.target.as_mut());
                align(&mut cursors, target)?
            };
            let Some(doc) = doc else {
                return Ok(None);
            };
            let relations = self.relations.take_doc()?;
            let sources = match &mut self.source {
                Some(cursor) => Some(cursor.take_doc()?),
                None => None,
            };
            let targets = match &mut self.target {
                Some(cursor) => Some(cursor.take_doc()?),
                None => None,
            };
            let matches = relation_matches(&relations, &self.spec, &sources, &targets);
            if !matches.is_empty() {
                return Ok(Some(matches));
            }
            target = doc.saturating_add(1);
        }
    }

    fn cost(&self) -> u64 {
        self.relations.cost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::spans::tests::{boxed, drain, spans};
    use crate::query::spans::{BufferedSpans, SpanIterator};
    use crate::types::{TEMP_SOURCE_CLASS, TEMP_TARGET_CLASS};

    fn posting(doc: DocId, start: u32, end: u32, target: (u32, u32)) -> PositionSpan {
        PositionSpan::with_payload(
            doc,
            start,
            end,
            vec![PayloadEntry::RelationTarget {
                start: target.0,
                end: target.1,
            }],
        )
    }

    // doc0: "Der Hund bellt" with np 0-2 and >:dep from np to "bellt"
    fn postings() -> Vec<PositionSpan> {
        vec![posting(0, 0, 2, (2, 3)), posting(0, 1, 2, (0, 1)), posting(1, 3, 4, (0, 2))]
    }

    fn relations(spec: &RelationSpec) -> Box<dyn SpanIterator> {
        Box::new(BufferedSpans::new(RelationMatcher::new(
            DocCursor::new(boxed(postings())),
            spec.clone(),
        )))
    }

    #[test]
    fn test_relation_spans_are_marked_with_endpoint_classes() {
        let spec = RelationSpec::new("base", ">:dep");
        let mut iter = relations(&spec);
        assert!(iter.next().unwrap());
        assert_eq!((iter.start().unwrap(), iter.end().unwrap()), (0, 2));
        assert_eq!(
            iter.payload().unwrap(),
            &[
                PayloadEntry::class_mark(TEMP_SOURCE_CLASS, 0, 2),
                PayloadEntry::class_mark(TEMP_TARGET_CLASS, 2, 3),
            ]
        );
    }

    #[test]
    fn test_custom_classes() {
        let spec = RelationSpec::new("base", ">:dep").with_source_class(1).with_target_class(2);
        let mut iter = relations(&spec);
        assert!(iter.next().unwrap());
        assert_eq!(iter.payload().unwrap()[0].as_class(), Some((1, 0, 2)));
        assert_eq!(iter.payload().unwrap()[1].as_class(), Some((2, 2, 3)));
    }

    #[test]
    fn test_postings_without_target_are_skipped() {
        let spec = RelationSpec::new("base", ">:dep");
        let matcher = RelationMatcher::new(DocCursor::new(boxed(spans(0, &[(0, 1)]))), spec);
        assert!(drain(Box::new(BufferedSpans::new(matcher))).is_empty());
    }

    fn relation_match(source: Option<Vec<PositionSpan>>, target: Option<Vec<PositionSpan>>) -> Vec<(DocId, u32, u32)> {
        let spec = RelationSpec::new("base", ">:dep");
        let matcher = RelationMatchMatcher::new(
            DocCursor::new(relations(&spec)),
            spec,
            source.map(|s| DocCursor::new(boxed(s))),
            target.map(|t| DocCursor::new(boxed(t))),
        );
        drain(Box::new(BufferedSpans::new(matcher)))
    }

    #[test]
    fn test_relation_match_covers_both_endpoints() {
        assert_eq!(relation_match(None, None), vec![(0, 0, 2), (0, 0, 3), (1, 0, 4)]);
    }

    #[test]
    fn test_relation_match_operands_must_equal_endpoints() {
        let np = spans(0, &[(0, 2)]);
        assert_eq!(relation_match(Some(np.clone()), None), vec![(0, 0, 3)]);
        assert_eq!(relation_match(None, Some(spans(0, &[(0, 1)]))), vec![(0, 0, 2)]);
        // a token inside the endpoint is not the endpoint
        assert!(relation_match(Some(spans(0, &[(0, 1)])), Some(spans(0, &[(2, 3)]))).is_empty());
        assert!(relation_match(None, Some(np)).is_empty());
    }

    #[test]
    fn test_relation_match_payload_order() {
        let spec = RelationSpec::new("base", ">:dep");
        let relation = vec![PositionSpan::with_payload(
            0,
            0,
            2,
            vec![
                PayloadEntry::class_mark(TEMP_SOURCE_CLASS, 0, 2),
                PayloadEntry::class_mark(TEMP_TARGET_CLASS, 2, 3),
            ],
        )];
        let source = vec![PositionSpan::with_payload(0, 0, 2, vec![PayloadEntry::class_mark(1, 0, 2)])];
        let target = vec![PositionSpan::with_payload(0, 2, 3, vec![PayloadEntry::class_mark(2, 2, 3)])];
        let matched = relation_matches(&relation, &spec, &Some(source), &Some(target));
        let classes: Vec<u8> = matched[0].payload.iter().filter_map(|e| e.as_class()).map(|c| c.0).collect();
        assert_eq!(classes, vec![TEMP_SOURCE_CLASS, TEMP_TARGET_CLASS, 1, 2]);
        assert_eq!((matched[0].start, matched[0].end), (0, 3));
    }
}
