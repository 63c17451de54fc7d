//! Distance between two operands, in tokens or in enclosing elements.
//!
//! Token gap between `a` and `b`:
//!
//! ```text
//! b after a:   start(b) - end(a) + 1
//! a after b:   start(a) - end(b) + 1
//! overlapping: 0
//! ```
//!
//! An ordered constraint only admits pairs where `b` starts at or after the
//! end of `a`. Unordered constraints consider every pair, in both
//! directions, so the same two spans can match twice when both operands are
//! the same term.
//!
//! Element distance counts the difference of the ordinals of the elements
//! enclosing each operand. A span outside every element of that name never
//! matches.

use crate::error::Result;
use crate::query::node::DistanceConstraint;
use crate::query::spans::{align, concat_payload, DocCursor, DocMatcher};
use crate::types::{DocId, PositionSpan};

pub struct DistanceMatcher {
    first: DocCursor,
    second: DocCursor,
    elements: Option<DocCursor>,
    constraint: DistanceConstraint,
}

impl DistanceMatcher {
    pub fn new(
        first: DocCursor,
        second: DocCursor,
        elements: Option<DocCursor>,
        constraint: DistanceConstraint,
    ) -> Self {
        Self {
            first,
            second,
            elements,
            constraint,
        }
    }

    fn element_spans(&mut self, doc: DocId) -> Result<Option<Vec<PositionSpan>>> {
        match &mut self.elements {
            Some(cursor) => Ok(Some(cursor.take_if_at(doc)?)),
            None => Ok(None),
        }
    }

    /// Matches of one document where both operands are present
    fn pair_matches(&mut self, doc: DocId) -> Result<Vec<PositionSpan>> {
        let first = self.first.take_doc()?;
        let second = self.second.take_doc()?;
        let elements = self.element_spans(doc)?;
        Ok(match elements {
            Some(elements) => element_matches(&first, &second, &elements, &self.constraint),
            None => token_matches(&first, &second, &self.constraint),
        })
    }

    /// First-operand spans of one document that have no admissible partner
    fn exclusive_matches(&mut self, doc: DocId) -> Result<Vec<PositionSpan>> {
        let first = self.first.take_doc()?;
        let second = self.second.take_if_at(doc)?;
        let elements = self.element_spans(doc)?;
        let ordinals = elements.as_ref().map(|e| ElementOrdinals::new(e));

        Ok(first
            .into_iter()
            .filter(|a| {
                !second.iter().any(|b| match &ordinals {
                    Some(ordinals) => ordinals.pair(a, b, &self.constraint),
                    None => token_pair(a, b, &self.constraint),
                })
            })
            .collect())
    }
}

impl DocMatcher for DistanceMatcher {
    fn match_from(&mut self, mut target: DocId) -> Result<Option<Vec<PositionSpan>>> {
        loop {
            let doc = if self.constraint.exclusive {
                self.first.seek(target)?
            } else {
                align(&mut [&mut self.first, &mut self.second], target)?
            };
            let Some(doc) = doc else {
                return Ok(None);
            };
            let matches = if self.constraint.exclusive {
                self.exclusive_matches(doc)?
            } else {
                self.pair_matches(doc)?
            };
            if !matches.is_empty() {
                return Ok(Some(matches));
            }
            target = doc.saturating_add(1);
        }
    }

    fn cost(&self) -> u64 {
        if self.constraint.exclusive {
            self.first.cost()
        } else {
            self.first.cost().min(self.second.cost())
        }
    }
}

/// Token gap of `b` relative to `a`, `None` when the order is violated
pub fn token_gap(a: &PositionSpan, b: &PositionSpan, ordered: bool) -> Option<u32> {
    if b.start >= a.end {
        Some(b.start - a.end + 1)
    } else if ordered {
        None
    } else if a.start >= b.end {
        Some(a.start - b.end + 1)
    } else {
        Some(0)
    }
}

fn token_pair(a: &PositionSpan, b: &PositionSpan, constraint: &DistanceConstraint) -> bool {
    token_gap(a, b, constraint.ordered).is_some_and(|gap| constraint.admits(gap))
}

fn joined(a: &PositionSpan, b: &PositionSpan) -> PositionSpan {
    PositionSpan::with_payload(
        a.doc,
        a.start.min(b.start),
        a.end.max(b.end),
        concat_payload(a, b),
    )
}

pub fn token_matches(
    first: &[PositionSpan],
    second: &[PositionSpan],
    constraint: &DistanceConstraint,
) -> Vec<PositionSpan> {
    let mut by_start: Vec<&PositionSpan> = second.iter().collect();
    by_start.sort_by_key(|s| (s.start, s.end));

    let mut matches = Vec::new();
    for a in first {
        // Nothing starting beyond this bound can be within `max` tokens
        let limit = a.end as u64 + constraint.max as u64;
        for b in by_start.iter().take_while(|b| (b.start as u64) < limit) {
            if token_pair(a, b, constraint) {
                matches.push(joined(a, b));
            }
        }
    }
    matches
}

/// Maps spans to the ordinal of the first element that contains them
struct ElementOrdinals {
    elements: Vec<(u32, u32)>,
}

impl ElementOrdinals {
    fn new(elements: &[PositionSpan]) -> Self {
        let mut elements: Vec<(u32, u32)> = elements.iter().map(|e| (e.start, e.end)).collect();
        elements.sort_unstable();
        elements.dedup();
        Self { elements }
    }

    fn ordinal(&self, span: &PositionSpan) -> Option<u32> {
        let candidates = self.elements.partition_point(|(start, _)| *start <= span.start);
        self.elements[..candidates]
            .iter()
            .position(|(start, end)| *start <= span.start && span.end <= *end)
            .map(|ord| ord as u32)
    }

    fn pair(&self, a: &PositionSpan, b: &PositionSpan, constraint: &DistanceConstraint) -> bool {
        let (Some(oa), Some(ob)) = (self.ordinal(a), self.ordinal(b)) else {
            return false;
        };
        if constraint.ordered {
            b.start >= a.start && ob >= oa && constraint.admits(ob - oa)
        } else {
            constraint.admits(oa.abs_diff(ob))
        }
    }
}

pub fn element_matches(
    first: &[PositionSpan],
    second: &[PositionSpan],
    elements: &[PositionSpan],
    constraint: &DistanceConstraint,
) -> Vec<PositionSpan> {
    let ordinals = ElementOrdinals::new(elements);
    let mut matches = Vec::new();
    for a in first {
        for b in second {
            if ordinals.pair(a, b, constraint) {
                matches.push(joined(a, b));
            }
        }
    }
    matches
}
