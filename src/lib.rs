pub mod collection;
pub mod data;
pub mod engine;
pub mod error;
pub mod query;
pub mod results;
pub mod search;
pub mod storage;
pub mod tantivy_integration;
pub mod types;

pub use collection::{Collection, CollectionBuilder, CollectionCache, FilterMode, FilterOperation, Predicate};
pub use data::{AnnotatedDocument, MetaValue, TokenStream};
pub use engine::{EngineConfig, SpanIndex};
pub use error::{ErrorReport, Result, SearchError};
pub use query::SpanNode;
pub use results::{Match, SearchResult};
pub use search::{ContextSpec, Evaluator, SearchRequest};
pub use storage::{LeafPredicate, SegmentStorage};
pub use types::{Bitmask, PayloadEntry, PositionSpan};
