//! Query evaluation: collection filtering, pagination and context windows

pub mod context;
pub mod evaluator;
pub mod filtered;

pub use context::{ContextSpec, ContextUnit, Side};
pub use evaluator::{Evaluator, MatchStream, SearchRequest};
