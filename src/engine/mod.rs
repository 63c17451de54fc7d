//! Index facade over tantivy
//!
//! This module is organized into the following submodules:
//! - `constants`: term prefixes, separators and companion field names
//! - `config`: engine configuration (IndexConfig, SearchConfig)
//! - `schema`: tantivy schema built from the index configuration
//! - `document`: conversion of annotated documents for indexing
//! - `core`: the SpanIndex struct

pub mod config;
pub mod constants;
pub mod core;
pub mod document;
pub mod schema;

pub use config::{EngineConfig, FieldConfig, FieldType, IndexConfig, SearchConfig};
pub use core::SpanIndex;
pub use schema::build_schema;
