//! Payload entries carried by spans, and their byte layout.
//!
//! Class marks are exchanged with renderers as 9 bytes:
//!
//! ```text
//! int32 BE start | int32 BE end | u8 class id
//! ```
//!
//! Relation targets use the first 8 bytes of the same layout. Attributes are
//! `key=value` in UTF-8 and raw entries pass through untouched.

use serde::{Deserialize, Serialize};
use zerocopy::{big_endian as be, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Class ids at or above this value are bookkeeping marks of the engine
pub const TEMPORARY_CLASS_MIN: u8 = 128;

/// Default class marking the endpoint a relation term is indexed at
pub const TEMP_SOURCE_CLASS: u8 = 254;

/// Default class marking the other endpoint of a relation
pub const TEMP_TARGET_CLASS: u8 = 255;

pub const CLASS_MARK_SIZE: usize = 9;
pub const RELATION_TARGET_SIZE: usize = 8;

pub fn is_temporary_class(class_id: u8) -> bool {
    class_id >= TEMPORARY_CLASS_MIN
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadEntry {
    ClassMark { class_id: u8, start: u32, end: u32 },
    RelationTarget { start: u32, end: u32 },
    Attribute { key: String, value: String },
    Raw { bytes: Vec<u8> },
}

/// Wire form of a class mark (9 bytes, no padding)
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct ClassMarkBytes {
    pub start: be::I32,
    pub end: be::I32,
    pub class_id: u8,
}

/// Wire form of a relation target (8 bytes)
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct RelationTargetBytes {
    pub start: be::I32,
    pub end: be::I32,
}

impl PayloadEntry {
    pub fn class_mark(class_id: u8, start: u32, end: u32) -> Self {
        PayloadEntry::ClassMark { class_id, start, end }
    }

    /// Class id and span if this entry is a class mark
    pub fn as_class(&self) -> Option<(u8, u32, u32)> {
        match self {
            PayloadEntry::ClassMark { class_id, start, end } => Some((*class_id, *start, *end)),
            _ => None,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.as_class(), Some((id, _, _)) if is_temporary_class(id))
    }

    /// Serialize one entry in the external byte layout
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PayloadEntry::ClassMark { class_id, start, end } => ClassMarkBytes {
                start: be::I32::new(*start as i32),
                end: be::I32::new(*end as i32),
                class_id: *class_id,
            }
            .as_bytes()
            .to_vec(),
            PayloadEntry::RelationTarget { start, end } => RelationTargetBytes {
                start: be::I32::new(*start as i32),
                end: be::I32::new(*end as i32),
            }
            .as_bytes()
            .to_vec(),
            PayloadEntry::Attribute { key, value } => format!("{}={}", key, value).into_bytes(),
            PayloadEntry::Raw { bytes } => bytes.clone(),
        }
    }

    /// Read a class mark from exactly 9 bytes
    pub fn decode_class_mark(bytes: &[u8]) -> Option<Self> {
        let mark = ClassMarkBytes::read_from_bytes(bytes).ok()?;
        let start = u32::try_from(mark.start.get()).ok()?;
        let end = u32::try_from(mark.end.get()).ok()?;
        Some(PayloadEntry::ClassMark {
            class_id: mark.class_id,
            start,
            end,
        })
    }

    /// Read a relation target from exactly 8 bytes
    pub fn decode_relation_target(bytes: &[u8]) -> Option<Self> {
        let target = RelationTargetBytes::read_from_bytes(bytes).ok()?;
        let start = u32::try_from(target.start.get()).ok()?;
        let end = u32::try_from(target.end.get()).ok()?;
        Some(PayloadEntry::RelationTarget { start, end })
    }
}

/// Encode a payload sequence entry by entry, keeping order
pub fn encode_payload(payload: &[PayloadEntry]) -> Vec<Vec<u8>> {
    payload.iter().map(PayloadEntry::to_bytes).collect()
}

/// Drop bookkeeping class marks, keep everything else in order
pub fn strip_temporary(payload: &[PayloadEntry]) -> Vec<PayloadEntry> {
    payload.iter().filter(|e| !e.is_temporary()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_mark_layout_is_nine_bytes_big_endian() {
        let mark = PayloadEntry::class_mark(3, 1, 258);
        let bytes = mark.to_bytes();
        assert_eq!(bytes.len(), CLASS_MARK_SIZE);
        assert_eq!(bytes, vec![0, 0, 0, 1, 0, 0, 1, 2, 3]);
        assert_eq!(PayloadEntry::decode_class_mark(&bytes), Some(mark));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(PayloadEntry::decode_class_mark(&[0, 0, 0, 1]), None);
        assert_eq!(PayloadEntry::decode_relation_target(&[0; 9]), None);
    }

    #[test]
    fn test_relation_target_layout() {
        let target = PayloadEntry::RelationTarget { start: 7, end: 9 };
        let bytes = target.to_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 7, 0, 0, 0, 9]);
        assert_eq!(PayloadEntry::decode_relation_target(&bytes), Some(target));
    }

    #[test]
    fn test_strip_temporary_keeps_order() {
        let payload = vec![
            PayloadEntry::class_mark(1, 0, 2),
            PayloadEntry::class_mark(TEMP_SOURCE_CLASS, 0, 1),
            PayloadEntry::Attribute {
                key: "func".to_string(),
                value: "sbj".to_string(),
            },
            PayloadEntry::class_mark(TEMP_TARGET_CLASS, 1, 2),
        ];
        let stripped = strip_temporary(&payload);
        assert_eq!(stripped.len(), 2);
        assert_eq!(stripped[0].as_class(), Some((1, 0, 2)));
        assert!(matches!(stripped[1], PayloadEntry::Attribute { .. }));
    }
}
