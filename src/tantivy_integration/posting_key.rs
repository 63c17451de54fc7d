//! Encoding of span data into indexed terms.
//!
//! A position only records where a term starts. Everything else a posting
//! needs is appended to the term:
//!
//! ```text
//! term \x1f field (\x1e field)*
//!
//! e<end>            span end (exclusive)
//! t<start>,<end>    relation target
//! r<hex>            raw payload bytes
//! n<count>          meta count
//! ```
//!
//! A plain token has no suffix at all.

use crate::engine::constants::{FIELD_SEPARATOR, KEY_SEPARATOR};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingKey {
    pub term: String,
    pub end: Option<u32>,
    pub target: Option<(u32, u32)>,
    pub raw: Option<Vec<u8>>,
    pub count: Option<u64>,
}

impl PostingKey {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            ..Default::default()
        }
    }

    pub fn with_end(mut self, end: u32) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_target(mut self, start: u32, end: u32) -> Self {
        self.target = Some((start, end));
        self
    }

    pub fn with_raw(mut self, bytes: Vec<u8>) -> Self {
        self.raw = Some(bytes);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn encode(&self) -> String {
        let mut fields = Vec::new();
        if let Some(end) = self.end {
            fields.push(format!("e{}", end));
        }
        if let Some((start, end)) = self.target {
            fields.push(format!("t{},{}", start, end));
        }
        if let Some(raw) = &self.raw {
            fields.push(format!("r{}", hex::encode(raw)));
        }
        if let Some(count) = self.count {
            fields.push(format!("n{}", count));
        }
        if fields.is_empty() {
            return self.term.clone();
        }
        let mut key = self.term.clone();
        key.push(KEY_SEPARATOR);
        key.push_str(&fields.join(&FIELD_SEPARATOR.to_string()));
        key
    }

    /// Parse an indexed key; `None` for a suffix this version cannot read
    pub fn parse(key: &str) -> Option<Self> {
        let Some((term, suffix)) = key.split_once(KEY_SEPARATOR) else {
            return Some(Self::new(key));
        };
        let mut parsed = Self::new(term);
        for field in suffix.split(FIELD_SEPARATOR) {
            let mut chars = field.chars();
            let kind = chars.next()?;
            let value = chars.as_str();
            match kind {
                'e' => parsed.end = Some(value.parse().ok()?),
                't' => {
                    let (start, end) = value.split_once(',')?;
                    parsed.target = Some((start.parse().ok()?, end.parse().ok()?));
                }
                'r' => parsed.raw = Some(hex::decode(value).ok()?),
                'n' => parsed.count = Some(value.parse().ok()?),
                _ => return None,
            }
        }
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_term_has_no_suffix() {
        assert_eq!(PostingKey::new("s:Hund").encode(), "s:Hund");
        assert_eq!(PostingKey::parse("s:Hund"), Some(PostingKey::new("s:Hund")));
    }

    #[test]
    fn test_relation_key() {
        let key = PostingKey::new(">:dep").with_end(2).with_target(4, 6);
        let encoded = key.encode();
        assert_eq!(encoded, ">:dep\u{1f}e2\u{1e}t4,6");
        assert_eq!(PostingKey::parse(&encoded), Some(key));
    }

    #[test]
    fn test_raw_and_count() {
        let key = PostingKey::new("-:t").with_count(42).with_raw(vec![0, 171]);
        let parsed = PostingKey::parse(&key.encode()).unwrap();
        assert_eq!(parsed.count, Some(42));
        assert_eq!(parsed.raw, Some(vec![0, 171]));
    }

    #[test]
    fn test_unreadable_suffix() {
        assert_eq!(PostingKey::parse("s:a\u{1f}x1"), None);
        assert_eq!(PostingKey::parse("s:a\u{1f}e"), None);
        assert_eq!(PostingKey::parse("s:a\u{1f}rabc"), None);
    }
}
