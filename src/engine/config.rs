//! Engine configuration: index schema and search limits

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::engine::constants::{
    DEFAULT_PARAGRAPH_ELEMENT, DEFAULT_SENTENCE_ELEMENT, DEFAULT_UID_FIELD, LENGTH_SUFFIX,
    OFFSETS_SUFFIX,
};
use crate::error::{Result, SearchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Exact-match string, e.g. a corpus sigle
    Keyword,
    /// Tokenized text for phrase predicates
    Text,
    /// Partial date, stored as `YYYYMMDD`
    Date,
    Integer,
    /// Annotated token stream searched with span queries
    Annotated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub stored: bool,
}

impl FieldConfig {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            stored: false,
        }
    }

    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }
}

fn default_uid_field() -> String {
    DEFAULT_UID_FIELD.to_string()
}

fn default_sentence_element() -> String {
    DEFAULT_SENTENCE_ELEMENT.to_string()
}

fn default_paragraph_element() -> String {
    DEFAULT_PARAGRAPH_ELEMENT.to_string()
}

fn default_fields() -> Vec<FieldConfig> {
    vec![FieldConfig::new("tokens", FieldType::Annotated)]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_uid_field")]
    pub uid_field: String,
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldConfig>,
    /// Element counted as a sentence
    #[serde(default = "default_sentence_element")]
    pub sentence_element: String,
    /// Element counted as a paragraph
    #[serde(default = "default_paragraph_element")]
    pub paragraph_element: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            uid_field: default_uid_field(),
            fields: default_fields(),
            sentence_element: default_sentence_element(),
            paragraph_element: default_paragraph_element(),
        }
    }
}

impl IndexConfig {
    pub fn with_fields(fields: Vec<FieldConfig>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn annotated_fields(&self) -> impl Iterator<Item = &FieldConfig> {
        self.fields
            .iter()
            .filter(|f| f.field_type == FieldType::Annotated)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        seen.insert(self.uid_field.as_str());
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SearchError::Config(format!(
                    "field '{}' is declared twice or clashes with the uid field",
                    field.name
                )));
            }
            if field.name.ends_with(LENGTH_SUFFIX) || field.name.ends_with(OFFSETS_SUFFIX) {
                return Err(SearchError::Config(format!(
                    "field name '{}' uses a reserved suffix",
                    field.name
                )));
            }
        }
        if self.annotated_fields().next().is_none() {
            return Err(SearchError::Config(
                "at least one annotated field is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_token_match_size: u32,
    pub max_token_context_size: u32,
    pub max_char_context_size: u32,
    pub default_search_context_length: u32,
    pub items_per_page: usize,
    pub max_items_per_page: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_token_match_size: 50,
            max_token_context_size: 60,
            max_char_context_size: 500,
            default_search_context_length: 6,
            items_per_page: 25,
            max_items_per_page: 50,
        }
    }
}

impl SearchConfig {
    /// Requested page size, or the default when it is 0 or too large
    pub fn page_size(&self, requested: usize) -> usize {
        if requested == 0 || requested > self.max_items_per_page {
            self.items_per_page
        } else {
            requested
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.max_items_per_page == 0 {
            return Err(SearchError::Config("max_items_per_page must be positive".to_string()));
        }
        if self.items_per_page == 0 || self.items_per_page > self.max_items_per_page {
            log::warn!(
                "items_per_page {} outside 1..={}, clamping",
                self.items_per_page,
                self.max_items_per_page
            );
            self.items_per_page = self.items_per_page.clamp(1, self.max_items_per_page);
        }
        if self.default_search_context_length > self.max_token_context_size {
            log::warn!(
                "default_search_context_length {} exceeds max_token_context_size {}, clamping",
                self.default_search_context_length,
                self.max_token_context_size
            );
            self.default_search_context_length = self.max_token_context_size;
        }
        if self.max_token_match_size == 0 {
            return Err(SearchError::Config("max_token_match_size must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: EngineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| SearchError::Config(format!("invalid YAML: {}", e)))?;
        config.index.validate()?;
        config.search.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SearchError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let yaml = fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml).map_err(|e| match e {
            SearchError::Config(message) => {
                SearchError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.index.uid_field, "UID");
        assert_eq!(config.search.max_token_match_size, 50);
        assert_eq!(config.search.items_per_page, 25);
        assert_eq!(config.index.annotated_fields().count(), 1);
    }

    #[test]
    fn test_yaml_fields_and_partial_search_section() {
        let yaml = r#"
index:
  fields:
    - { name: tokens, type: annotated }
    - { name: textSigle, type: keyword, stored: true }
    - { name: pubDate, type: date }
search:
  items_per_page: 10
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.index.fields.len(), 3);
        assert_eq!(config.index.field("pubDate").unwrap().field_type, FieldType::Date);
        assert!(config.index.field("textSigle").unwrap().stored);
        assert_eq!(config.search.items_per_page, 10);
        assert_eq!(config.search.max_items_per_page, 50);
    }

    #[test]
    fn test_page_size_fallback() {
        let config = SearchConfig::default();
        assert_eq!(config.page_size(0), 25);
        assert_eq!(config.page_size(10), 10);
        assert_eq!(config.page_size(50), 50);
        assert_eq!(config.page_size(51), 25);
    }

    #[test]
    fn test_invalid_configs() {
        let duplicate = "index:\n  fields:\n    - { name: a, type: annotated }\n    - { name: a, type: keyword }\n";
        assert!(matches!(EngineConfig::from_yaml_str(duplicate), Err(SearchError::Config(_))));
        let no_annotated = "index:\n  fields:\n    - { name: a, type: keyword }\n";
        assert!(EngineConfig::from_yaml_str(no_annotated).is_err());
        assert!(EngineConfig::from_yaml_str("index: [").is_err());
        assert!(EngineConfig::from_yaml_file("/nonexistent/spandex.yaml").is_err());
    }

    #[test]
    fn test_search_values_are_clamped() {
        let config = EngineConfig::from_yaml_str("search:\n  items_per_page: 80\n").unwrap();
        assert_eq!(config.search.items_per_page, 50);
    }
}
