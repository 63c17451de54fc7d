//! Span queries: the query tree and the combinators evaluating it.
//!
//! - `spans`: iterator contract and the doc-at-a-time machinery
//! - `node`: `SpanNode`, the query tree handed to the evaluator
//! - one module per combinator

pub mod attribute;
pub mod class;
pub mod distance;
pub mod focus;
pub mod next;
pub mod node;
pub mod or;
pub mod relation;
pub mod segment_match;
pub mod spans;
pub mod within;

pub use node::{DistanceConstraint, DistanceUnit, RelationSpec, SpanNode, WithinEmit, WithinMode};
pub use spans::{SpanIterator, VecSpans};
