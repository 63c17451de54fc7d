//! Term prefixes, field suffixes and separators shared by indexing and search

/// Structural element spanning several positions, `<>:s`
pub const ELEMENT_PREFIX: &str = "<>:";
/// Outgoing relation, stored at its source
pub const RELATION_OUT_PREFIX: &str = ">:";
/// Incoming relation, stored at its target
pub const RELATION_IN_PREFIX: &str = "<:";
pub const ATTRIBUTE_PREFIX: &str = "@:";
/// Per-document counts stored at position 0
pub const META_PREFIX: &str = "-:";

/// Separates a term from its encoded posting fields
pub const KEY_SEPARATOR: char = '\u{1f}';
/// Separates encoded posting fields from each other
pub const FIELD_SEPARATOR: char = '\u{1e}';
/// Separates token positions in the indexed text of an annotated field
pub const POSITION_SEPARATOR: char = '\u{1d}';
/// Separates annotations of one position in the indexed text
pub const ANNOTATION_SEPARATOR: char = '\u{1c}';

pub const ANNOTATION_TOKENIZER: &str = "annotation";

pub const LENGTH_SUFFIX: &str = "_length";
pub const OFFSETS_SUFFIX: &str = "_offsets";

pub const DEFAULT_UID_FIELD: &str = "UID";
pub const DEFAULT_SENTENCE_ELEMENT: &str = "s";
pub const DEFAULT_PARAGRAPH_ELEMENT: &str = "p";

/// Meta count units
pub const UNIT_TOKENS: &str = "t";
pub const UNIT_SENTENCES: &str = "s";
pub const UNIT_PARAGRAPHS: &str = "p";

pub fn length_field(field: &str) -> String {
    format!("{}{}", field, LENGTH_SUFFIX)
}

pub fn offsets_field(field: &str) -> String {
    format!("{}{}", field, OFFSETS_SUFFIX)
}

pub fn meta_term(unit: &str) -> String {
    format!("{}{}", META_PREFIX, unit)
}
