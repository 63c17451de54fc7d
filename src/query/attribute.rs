//! Restricts spans to those carrying (or lacking) an attribute.
//!
//! Attributes are indexed as `@:key=value` at the position of the span they
//! qualify, with the same start and end. Their postings carry the attribute
//! itself as payload.

use crate::error::Result;
use crate::query::spans::{align, DocCursor, DocMatcher};
use crate::types::{DocId, PositionSpan};

pub struct AttributeMatcher {
    operand: DocCursor,
    attributes: DocCursor,
    negated: bool,
}

impl AttributeMatcher {
    pub fn new(operand: DocCursor, attributes: DocCursor, negated: bool) -> Self {
        Self {
            operand,
            attributes,
            negated,
        }
    }

    fn positioned(&mut self, target: DocId) -> Result<Option<DocId>> {
        if self.negated {
            self.operand.seek(target)
        } else {
            align(&mut [&mut self.operand, &mut self.attributes], target)
        }
    }
}

pub fn attribute_matches(
    spans: Vec<PositionSpan>,
    attributes: &[PositionSpan],
    negated: bool,
) -> Vec<PositionSpan> {
    spans
        .into_iter()
        .filter_map(|mut span| {
            let found = attributes.iter().find(|a| a.same_position(&span));
            match (found, negated) {
                (Some(attribute), false) => {
                    span.payload.extend(attribute.payload.iter().cloned());
                    Some(span)
                }
                (None, true) => Some(span),
                _ => None,
            }
        })
        .collect()
}

impl DocMatcher for AttributeMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let Some(doc) = self.positioned(target)? else {
                return Ok(None);
            };
            let spans = self.operand.take_doc()?;
            let attributes = self.attributes.take_if_at(doc)?;
            let matches = attribute_matches(spans, &attributes, self.negated);
            if !matches.is_empty() {
                return Ok(Some(matches));
            }
            target = doc.saturating_add(1);
        }
    }

    fn cost(&self) -> u64 {
        if self.negated {
            self.operand.cost()
        } else {
            self.operand.cost().min(self.attributes.cost())
        }
    }
}
