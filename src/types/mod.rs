pub mod bitmask;
pub mod payload;
pub mod span;

pub use bitmask::Bitmask;
pub use payload::{PayloadEntry, TEMP_SOURCE_CLASS, TEMP_TARGET_CLASS};
pub use span::{DocId, PositionSpan};
