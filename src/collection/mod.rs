//! Virtual collections: document subsets defined by filter predicates
//!
//! - `builder`: predicate construction and validation
//! - `cache`: named collections and their per-segment bitmasks
//! - `date`: partial date bounds for date predicates
//! - `virtual_collection`: the filter/extend pipeline

pub mod builder;
pub mod cache;
pub mod date;
pub mod virtual_collection;

pub use builder::{CollectionBuilder, GroupChild, GroupOp, Predicate};
pub use cache::CollectionCache;
pub use date::PartialDate;
pub use virtual_collection::{Collection, FilterMode, FilterOperation};
