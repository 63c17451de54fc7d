use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::constants::{
    meta_term, ATTRIBUTE_PREFIX, ELEMENT_PREFIX, RELATION_IN_PREFIX, RELATION_OUT_PREFIX,
    UNIT_PARAGRAPHS, UNIT_SENTENCES, UNIT_TOKENS,
};
use crate::error::{Result, SearchError};
use crate::tantivy_integration::posting_key::PostingKey;

/// One annotation attached to a token position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// Token-level term such as `s:Hund` or `pos:NN`
    Term {
        term: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Vec<u8>>,
    },
    /// Structural element from this position to `end` (exclusive)
    Element { name: String, end: u32 },
    /// Directed edge from `start(position)..left_end` to `target`
    Relation {
        label: String,
        left_end: u32,
        target_start: u32,
        target_end: u32,
    },
    Attribute { key: String, value: String, end: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPosition {
    /// Character offsets of the token in the primary text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<(u32, u32)>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Annotated token stream of one field of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenStream {
    positions: Vec<TokenPosition>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the bracketed annotation format
    pub fn parse(text: &str) -> Result<Self> {
        crate::data::parser::parse_token_stream(text)
    }

    /// One surface term per whitespace-separated word, with character offsets
    pub fn from_text(prefix: &str, text: &str) -> Self {
        let mut stream = Self::new();
        let mut offset = 0usize;
        for word in text.split_whitespace() {
            let from = text[offset..].find(word).map_or(offset, |i| offset + i);
            let to = from + word.len();
            let position = stream.push_token(&[&format!("{}{}", prefix, word)]);
            stream.set_offsets(position, from as u32, to as u32);
            offset = to;
        }
        stream
    }

    pub fn len(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[TokenPosition] {
        &self.positions
    }

    /// Append a token position carrying `terms`; returns its position
    pub fn push_token(&mut self, terms: &[&str]) -> u32 {
        let position = self.len();
        self.positions.push(TokenPosition {
            offsets: None,
            annotations: terms
                .iter()
                .map(|t| Annotation::Term {
                    term: t.to_string(),
                    payload: None,
                })
                .collect(),
        });
        position
    }

    fn at(&mut self, position: u32) -> &mut TokenPosition {
        let index = position as usize;
        if self.positions.len() <= index {
            self.positions.resize_with(index + 1, TokenPosition::default);
        }
        &mut self.positions[index]
    }

    pub fn set_offsets(&mut self, position: u32, from: u32, to: u32) {
        self.at(position).offsets = Some((from, to));
    }

    pub fn add_term(&mut self, position: u32, term: &str) {
        self.at(position).annotations.push(Annotation::Term {
            term: term.to_string(),
            payload: None,
        });
    }

    pub fn add_term_with_payload(&mut self, position: u32, term: &str, payload: Vec<u8>) {
        self.at(position).annotations.push(Annotation::Term {
            term: term.to_string(),
            payload: Some(payload),
        });
    }

    pub fn add_element(&mut self, name: &str, start: u32, end: u32) {
        self.at(start).annotations.push(Annotation::Element {
            name: name.to_string(),
            end: end.max(start + 1),
        });
    }

    /// Relation from `source` to `target`, both `(start, end)` token spans
    pub fn add_relation(&mut self, label: &str, source: (u32, u32), target: (u32, u32)) {
        self.at(source.0).annotations.push(Annotation::Relation {
            label: label.to_string(),
            left_end: source.1.max(source.0 + 1),
            target_start: target.0,
            target_end: target.1.max(target.0 + 1),
        });
    }

    pub fn add_attribute(&mut self, key: &str, value: &str, start: u32, end: u32) {
        self.at(start).annotations.push(Annotation::Attribute {
            key: key.to_string(),
            value: value.to_string(),
            end: end.max(start + 1),
        });
    }

    /// Character offsets per position, when every position has them
    pub fn offsets(&self) -> Option<Vec<(u32, u32)>> {
        self.positions.iter().map(|p| p.offsets).collect()
    }

    fn count_elements(&self, name: &str) -> u64 {
        self.positions
            .iter()
            .flat_map(|p| p.annotations.iter())
            .filter(|a| matches!(a, Annotation::Element { name: n, .. } if n == name))
            .count() as u64
    }

    /// Posting keys per position, including inverse relations and meta counts.
    ///
    /// Relation targets must lie inside the stream.
    pub fn posting_keys(&self, sentence_element: &str, paragraph_element: &str) -> Result<Vec<Vec<String>>> {
        let mut keys: Vec<Vec<String>> = vec![Vec::new(); self.positions.len().max(1)];
        keys[0].push(PostingKey::new(&meta_term(UNIT_TOKENS)).with_count(self.len() as u64).encode());
        keys[0].push(
            PostingKey::new(&meta_term(UNIT_SENTENCES))
                .with_count(self.count_elements(sentence_element))
                .encode(),
        );
        keys[0].push(
            PostingKey::new(&meta_term(UNIT_PARAGRAPHS))
                .with_count(self.count_elements(paragraph_element))
                .encode(),
        );

        for (index, position) in self.positions.iter().enumerate() {
            let start = index as u32;
            for annotation in &position.annotations {
                match annotation {
                    Annotation::Term { term, payload } => {
                        let mut key = PostingKey::new(term);
                        if let Some(bytes) = payload {
                            key = key.with_raw(bytes.clone());
                        }
                        keys[index].push(key.encode());
                    }
                    Annotation::Element { name, end } => keys[index].push(
                        PostingKey::new(&format!("{}{}", ELEMENT_PREFIX, name))
                            .with_end(*end)
                            .encode(),
                    ),
                    Annotation::Relation {
                        label,
                        left_end,
                        target_start,
                        target_end,
                    } => {
                        keys[index].push(
                            PostingKey::new(&format!("{}{}", RELATION_OUT_PREFIX, label))
                                .with_end(*left_end)
                                .with_target(*target_start, *target_end)
                                .encode(),
                        );
                        if *target_start >= *target_end || *target_end > self.len() {
                            return Err(SearchError::Annotation {
                                position: index,
                                message: format!(
                                    "relation '{}' at token {} targets {}-{} outside the {} tokens of the stream",
                                    label,
                                    index,
                                    target_start,
                                    target_end,
                                    self.len()
                                ),
                            });
                        }
                        keys[*target_start as usize].push(
                            PostingKey::new(&format!("{}{}", RELATION_IN_PREFIX, label))
                                .with_end(*target_end)
                                .with_target(start, *left_end)
                                .encode(),
                        );
                    }
                    Annotation::Attribute { key, value, end } => keys[index].push(
                        PostingKey::new(&format!("{}{}={}", ATTRIBUTE_PREFIX, key, value))
                            .with_end(*end)
                            .encode(),
                    ),
                }
            }
        }
        Ok(keys)
    }

    /// Render in the bracketed annotation format
    pub fn to_annotation_string(&self) -> String {
        let mut out = String::new();
        for (index, position) in self.positions.iter().enumerate() {
            out.push('[');
            if let Some((from, to)) = position.offsets {
                out.push_str(&format!("({}-{})", from, to));
            }
            let rendered: Vec<String> = position
                .annotations
                .iter()
                .map(|a| render_annotation(index as u32, a))
                .collect();
            out.push_str(&rendered.join("|"));
            out.push(']');
        }
        out
    }
}

fn render_annotation(position: u32, annotation: &Annotation) -> String {
    match annotation {
        Annotation::Term { term, payload: None } => term.clone(),
        Annotation::Term {
            term,
            payload: Some(bytes),
        } => format!("{}^{}", term, hex::encode(bytes)),
        Annotation::Element { name, end } => format!("{}{}#{}", ELEMENT_PREFIX, name, end),
        Annotation::Relation {
            label,
            left_end,
            target_start,
            target_end,
        } => {
            let left = if *left_end == position + 1 {
                String::new()
            } else {
                format!("#{}", left_end)
            };
            format!(
                "{}{}{}${}-{}",
                RELATION_OUT_PREFIX, label, left, target_start, target_end
            )
        }
        Annotation::Attribute { key, value, end } => {
            format!("{}{}={}#{}", ATTRIBUTE_PREFIX, key, value, end)
        }
    }
}

impl TryFrom<String> for TokenStream {
    type Error = SearchError;

    fn try_from(text: String) -> Result<Self> {
        TokenStream::parse(&text)
    }
}

impl From<TokenStream> for String {
    fn from(stream: TokenStream) -> String {
        stream.to_annotation_string()
    }
}

/// Metadata value; the schema decides how it is indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Integer(i64),
    Text(String),
}

/// A document as handed to the index: identifier, metadata and annotated fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub uid: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetaValue>,
    #[serde(default)]
    pub fields: BTreeMap<String, TokenStream>,
}

impl AnnotatedDocument {
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            ..Default::default()
        }
    }

    pub fn with_meta(mut self, field: &str, value: MetaValue) -> Self {
        self.metadata.insert(field.to_string(), value);
        self
    }

    pub fn with_field(mut self, field: &str, stream: TokenStream) -> Self {
        self.fields.insert(field.to_string(), stream);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_sets_offsets() {
        let stream = TokenStream::from_text("s:", "der  Hund bellt");
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.offsets(), Some(vec![(0, 3), (5, 9), (10, 15)]));
    }

    #[test]
    fn test_relation_keys_include_inverse() {
        let mut stream = TokenStream::from_text("s:", "a b c");
        stream.add_relation("dep", (0, 2), (2, 3));
        let keys = stream.posting_keys("s", "p").unwrap();
        assert!(keys[0].contains(&">:dep\u{1f}e2\u{1e}t2,3".to_string()));
        assert!(keys[2].contains(&"<:dep\u{1f}e3\u{1e}t0,2".to_string()));
    }

    #[test]
    fn test_relation_target_outside_stream_is_rejected() {
        let far = TokenStream::parse("[s:a|>:dep$3000000000]").unwrap();
        let err = far.posting_keys("s", "p").unwrap_err();
        assert_eq!(err.code(), 850);

        let mut past_end = TokenStream::from_text("s:", "a b");
        past_end.add_relation("dep", (0, 1), (1, 3));
        assert!(past_end.posting_keys("s", "p").is_err());

        let mut last = TokenStream::from_text("s:", "a b");
        last.add_relation("dep", (0, 1), (1, 2));
        assert!(last.posting_keys("s", "p").unwrap()[1].contains(&"<:dep\u{1f}e2\u{1e}t0,1".to_string()));
    }

    #[test]
    fn test_meta_counts_at_first_position() {
        let mut stream = TokenStream::from_text("s:", "a b c d");
        stream.add_element("s", 0, 2);
        stream.add_element("s", 2, 4);
        stream.add_element("p", 0, 4);
        let keys = stream.posting_keys("s", "p").unwrap();
        assert!(keys[0].contains(&"-:t\u{1f}n4".to_string()));
        assert!(keys[0].contains(&"-:s\u{1f}n2".to_string()));
        assert!(keys[0].contains(&"-:p\u{1f}n1".to_string()));
        assert!(keys[0].contains(&"<>:s\u{1f}e2".to_string()));
    }

    #[test]
    fn test_document_from_json() {
        let json = r#"{"uid":"a1","metadata":{"pubDate":"2005-03-12","pages":12},"fields":{"base":"[s:a][s:b|<>:x#2]"}}"#;
        let doc: AnnotatedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.metadata["pages"], MetaValue::Integer(12));
        assert_eq!(doc.fields["base"].len(), 2);
        assert!(serde_json::from_str::<AnnotatedDocument>(r#"{"uid":"a","fields":{"base":"[s:a"}}"#).is_err());
    }
}
