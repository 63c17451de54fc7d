//! Span query tree.
//!
//! A `SpanNode` is built once from an already-parsed query and reused for
//! every segment; `spans()` instantiates a fresh iterator tree per segment.

use serde::{Deserialize, Serialize};

use crate::engine::constants::{ATTRIBUTE_PREFIX, ELEMENT_PREFIX};
use crate::error::{Result, SearchError};
use crate::query::attribute::AttributeMatcher;
use crate::query::class::ClassMatcher;
use crate::query::distance::DistanceMatcher;
use crate::query::focus::FocusMatcher;
use crate::query::next::NextMatcher;
use crate::query::or::OrMatcher;
use crate::query::relation::{RelationMatchMatcher, RelationMatcher};
use crate::query::segment_match::SegmentMatcher;
use crate::query::spans::{BufferedSpans, DocCursor, SpanIterator};
use crate::query::within::WithinMatcher;
use crate::storage::SegmentStorage;
use crate::types::{TEMP_SOURCE_CLASS, TEMP_TARGET_CLASS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    Token,
    /// Distance counted in elements of this name (e.g. sentences)
    Element(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceConstraint {
    pub min: u32,
    pub max: u32,
    pub ordered: bool,
    pub exclusive: bool,
    pub unit: DistanceUnit,
}

impl DistanceConstraint {
    pub fn tokens(min: u32, max: u32, ordered: bool) -> Self {
        Self {
            min,
            max,
            ordered,
            exclusive: false,
            unit: DistanceUnit::Token,
        }
    }

    pub fn elements(element: &str, min: u32, max: u32, ordered: bool) -> Self {
        Self {
            min,
            max,
            ordered,
            exclusive: false,
            unit: DistanceUnit::Element(element.to_string()),
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn admits(&self, gap: u32) -> bool {
        self.min <= gap && gap <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithinMode {
    Contains,
    StartsWith,
    EndsWith,
    Match,
    Overlaps,
}

/// Which side of a within pair is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithinEmit {
    Container,
    Embedded,
}

/// A relation term and the classes its endpoints are marked with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub field: String,
    /// Full relation term, `>:label` or `<:label`
    pub label: String,
    /// Marks the endpoint the term is indexed at
    pub source_class: u8,
    /// Marks the other endpoint
    pub target_class: u8,
}

impl RelationSpec {
    pub fn new(field: &str, label: &str) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
            source_class: TEMP_SOURCE_CLASS,
            target_class: TEMP_TARGET_CLASS,
        }
    }

    pub fn with_source_class(mut self, class_id: u8) -> Self {
        self.source_class = class_id;
        self
    }

    pub fn with_target_class(mut self, class_id: u8) -> Self {
        self.target_class = class_id;
        self
    }

    pub fn classes(&self) -> Vec<u8> {
        vec![self.source_class, self.target_class]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpanNode {
    Term {
        field: String,
        term: String,
    },
    Element {
        field: String,
        name: String,
    },
    Next {
        first: Box<SpanNode>,
        second: Box<SpanNode>,
    },
    Distance {
        first: Box<SpanNode>,
        second: Box<SpanNode>,
        constraint: DistanceConstraint,
    },
    Within {
        container: Box<SpanNode>,
        embedded: Box<SpanNode>,
        mode: WithinMode,
        emit: WithinEmit,
    },
    Class {
        operand: Box<SpanNode>,
        class_id: u8,
    },
    Relation(RelationSpec),
    RelationMatch {
        relation: RelationSpec,
        source: Option<Box<SpanNode>>,
        target: Option<Box<SpanNode>>,
    },
    WithAttribute {
        operand: Box<SpanNode>,
        field: String,
        key: String,
        value: String,
        negated: bool,
    },
    Focus {
        operand: Box<SpanNode>,
        classes: Vec<u8>,
        remove_temporary: bool,
        sorted: bool,
    },
    Or {
        children: Vec<SpanNode>,
    },
    Segment {
        first: Box<SpanNode>,
        second: Box<SpanNode>,
    },
}

impl SpanNode {
    pub fn term(field: &str, term: &str) -> Self {
        SpanNode::Term {
            field: field.to_string(),
            term: term.to_string(),
        }
    }

    pub fn element(field: &str, name: &str) -> Self {
        SpanNode::Element {
            field: field.to_string(),
            name: name.to_string(),
        }
    }

    pub fn next(first: SpanNode, second: SpanNode) -> Self {
        SpanNode::Next {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    pub fn distance(first: SpanNode, second: SpanNode, constraint: DistanceConstraint) -> Self {
        SpanNode::Distance {
            first: Box::new(first),
            second: Box::new(second),
            constraint,
        }
    }

    /// Embedded spans inside the container
    pub fn within(container: SpanNode, embedded: SpanNode, mode: WithinMode) -> Self {
        SpanNode::Within {
            container: Box::new(container),
            embedded: Box::new(embedded),
            mode,
            emit: WithinEmit::Embedded,
        }
    }

    /// Container spans holding the embedded operand
    pub fn containing(container: SpanNode, embedded: SpanNode, mode: WithinMode) -> Self {
        SpanNode::Within {
            container: Box::new(container),
            embedded: Box::new(embedded),
            mode,
            emit: WithinEmit::Container,
        }
    }

    pub fn class(operand: SpanNode, class_id: u8) -> Self {
        SpanNode::Class {
            operand: Box::new(operand),
            class_id,
        }
    }

    pub fn relation(spec: RelationSpec) -> Self {
        SpanNode::Relation(spec)
    }

    pub fn relation_match(
        relation: RelationSpec,
        source: Option<SpanNode>,
        target: Option<SpanNode>,
    ) -> Self {
        SpanNode::RelationMatch {
            relation,
            source: source.map(Box::new),
            target: target.map(Box::new),
        }
    }

    pub fn with_attribute(operand: SpanNode, field: &str, key: &str, value: &str) -> Self {
        SpanNode::WithAttribute {
            operand: Box::new(operand),
            field: field.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            negated: false,
        }
    }

    pub fn without_attribute(operand: SpanNode, field: &str, key: &str, value: &str) -> Self {
        SpanNode::WithAttribute {
            operand: Box::new(operand),
            field: field.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            negated: true,
        }
    }

    pub fn focus(operand: SpanNode, classes: Vec<u8>) -> Self {
        SpanNode::Focus {
            operand: Box::new(operand),
            classes,
            remove_temporary: true,
            sorted: true,
        }
    }

    pub fn or(children: Vec<SpanNode>) -> Self {
        SpanNode::Or { children }
    }

    pub fn segment(first: SpanNode, second: SpanNode) -> Self {
        SpanNode::Segment {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Disable or enable post-projection sorting of a focus node
    pub fn set_sorted(mut self, value: bool) -> Self {
        if let SpanNode::Focus { sorted, .. } = &mut self {
            *sorted = value;
        }
        self
    }

    pub fn keep_temporary_classes(mut self) -> Self {
        if let SpanNode::Focus { remove_temporary, .. } = &mut self {
            *remove_temporary = false;
        }
        self
    }

    /// Annotated field the leaves of this tree read from
    pub fn field(&self) -> Option<&str> {
        match self {
            SpanNode::Term { field, .. } | SpanNode::Element { field, .. } => Some(field),
            SpanNode::Relation(spec) | SpanNode::RelationMatch { relation: spec, .. } => {
                Some(&spec.field)
            }
            SpanNode::Next { first, .. }
            | SpanNode::Distance { first, .. }
            | SpanNode::Segment { first, .. } => first.field(),
            SpanNode::Within { container, .. } => container.field(),
            SpanNode::Class { operand, .. }
            | SpanNode::WithAttribute { operand, .. }
            | SpanNode::Focus { operand, .. } => operand.field(),
            SpanNode::Or { children } => children.iter().find_map(|c| c.field()),
        }
    }

    /// Build the iterator tree of this query for one segment
    pub fn spans(&self, segment: &dyn SegmentStorage) -> Result<Box<dyn SpanIterator>> {
        let iter: Box<dyn SpanIterator> = match self {
            SpanNode::Term { field, term } => segment.postings(field, term)?,
            SpanNode::Element { field, name } => {
                segment.postings(field, &format!("{}{}", ELEMENT_PREFIX, name))?
            }
            SpanNode::Next { first, second } => Box::new(BufferedSpans::new(NextMatcher::new(
                cursor(first, segment)?,
                cursor(second, segment)?,
            ))),
            SpanNode::Distance {
                first,
                second,
                constraint,
            } => {
                let elements = match &constraint.unit {
                    DistanceUnit::Token => None,
                    DistanceUnit::Element(name) => {
                        let field = first.field().ok_or_else(|| {
                            SearchError::malformed("element distance needs a field-bound operand")
                        })?;
                        Some(DocCursor::new(
                            segment.postings(field, &format!("{}{}", ELEMENT_PREFIX, name))?,
                        ))
                    }
                };
                Box::new(BufferedSpans::new(DistanceMatcher::new(
                    cursor(first, segment)?,
                    cursor(second, segment)?,
                    elements,
                    constraint.clone(),
                )))
            }
            SpanNode::Within {
                container,
                embedded,
                mode,
                emit,
            } => Box::new(BufferedSpans::new(WithinMatcher::new(
                cursor(container, segment)?,
                cursor(embedded, segment)?,
                *mode,
                *emit,
            ))),
            SpanNode::Class { operand, class_id } => Box::new(BufferedSpans::new(
                ClassMatcher::new(cursor(operand, segment)?, *class_id),
            )),
            SpanNode::Relation(spec) => Box::new(BufferedSpans::new(RelationMatcher::new(
                DocCursor::new(segment.postings(&spec.field, &spec.label)?),
                spec.clone(),
            ))),
            SpanNode::RelationMatch {
                relation,
                source,
                target,
            } => {
                let relation_cursor = DocCursor::new(Box::new(BufferedSpans::new(
                    RelationMatcher::new(
                        DocCursor::new(segment.postings(&relation.field, &relation.label)?),
                        relation.clone(),
                    ),
                )));
                let source = source.as_ref().map(|n| cursor(n, segment)).transpose()?;
                let target = target.as_ref().map(|n| cursor(n, segment)).transpose()?;
                Box::new(BufferedSpans::new(RelationMatchMatcher::new(
                    relation_cursor,
                    relation.clone(),
                    source,
                    target,
                )))
            }
            SpanNode::WithAttribute {
                operand,
                field,
                key,
                value,
                negated,
            } => {
                let attributes = segment.postings(field, &format!("{}{}={}", ATTRIBUTE_PREFIX, key, value))?;
                Box::new(BufferedSpans::new(AttributeMatcher::new(
                    cursor(operand, segment)?,
                    DocCursor::new(attributes),
                    *negated,
                )))
            }
            SpanNode::Focus {
                operand,
                classes,
                remove_temporary,
                sorted,
            } => Box::new(BufferedSpans::new(FocusMatcher::new(
                cursor(operand, segment)?,
                classes.clone(),
                *remove_temporary,
                *sorted,
            ))),
            SpanNode::Or { children } => {
                let cursors = children
                    .iter()
                    .map(|c| cursor(c, segment))
                    .collect::<Result<Vec<_>>>()?;
                Box::new(BufferedSpans::new(OrMatcher::new(cursors)))
            }
            SpanNode::Segment { first, second } => Box::new(BufferedSpans::new(
                SegmentMatcher::new(cursor(first, segment)?, cursor(second, segment)?),
            )),
        };
        Ok(iter)
    }
}

fn cursor(node: &SpanNode, segment: &dyn SegmentStorage) -> Result<DocCursor> {
    Ok(DocCursor::new(node.spans(segment)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_is_found_through_combinators() {
        let query = SpanNode::focus(
            SpanNode::class(
                SpanNode::next(SpanNode::term("base", "s:a"), SpanNode::term("base", "s:b")),
                1,
            ),
            vec![1],
        );
        assert_eq!(query.field(), Some("base"));
        assert_eq!(SpanNode::or(Vec::new()).field(), None);
    }

    #[test]
    fn test_focus_flags() {
        let query = SpanNode::focus(SpanNode::term("base", "s:a"), vec![1])
            .set_sorted(false)
            .keep_temporary_classes();
        match query {
            SpanNode::Focus {
                sorted,
                remove_temporary,
                ..
            } => {
                assert!(!sorted);
                assert!(!remove_temporary);
            }
            _ => panic!("expected a focus node"),
        }
    }

    #[test]
    fn test_distance_constraint_bounds() {
        let constraint = DistanceConstraint::tokens(1, 3, true);
        assert!(!constraint.admits(0));
        assert!(constraint.admits(1));
        assert!(constraint.admits(3));
        assert!(!constraint.admits(4));
        assert!(DistanceConstraint::elements("s", 0, 0, false).exclusive().exclusive);
    }

    #[test]
    fn test_query_tree_serializes() {
        let query = SpanNode::relation_match(
            RelationSpec::new("base", ">:child-of").with_target_class(2),
            None,
            Some(SpanNode::element("base", "np")),
        );
        let json = serde_json::to_string(&query).unwrap();
        let back: SpanNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
    }
}
