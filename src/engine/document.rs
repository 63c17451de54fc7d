//! Conversion of annotated documents into tantivy documents

use tantivy::schema::Schema;
use tantivy::TantivyDocument;

use crate::collection::date::PartialDate;
use crate::data::{AnnotatedDocument, MetaValue};
use crate::engine::config::{FieldType, IndexConfig};
use crate::engine::constants::{length_field, offsets_field};
use crate::error::{Result, SearchError};
use crate::tantivy_integration::offsets::encode_offsets;
use crate::tantivy_integration::position_tokenizer::encode_positions;

fn invalid(doc: &AnnotatedDocument, message: String) -> SearchError {
    SearchError::Config(format!("document '{}': {}", doc.uid, message))
}

pub fn to_tantivy_document(
    doc: &AnnotatedDocument,
    schema: &Schema,
    config: &IndexConfig,
) -> Result<TantivyDocument> {
    let mut out = TantivyDocument::default();
    out.add_text(schema.get_field(&config.uid_field)?, &doc.uid);

    for (name, value) in &doc.metadata {
        let Some(field_config) = config.field(name) else {
            log::warn!("document '{}': skipping undeclared field '{}'", doc.uid, name);
            continue;
        };
        let field = schema.get_field(name)?;
        match (field_config.field_type, value) {
            (FieldType::Keyword | FieldType::Text, MetaValue::Text(text)) => out.add_text(field, text),
            (FieldType::Keyword | FieldType::Text, MetaValue::Integer(number)) => {
                out.add_text(field, number.to_string())
            }
            (FieldType::Date, MetaValue::Text(text)) => {
                out.add_i64(field, PartialDate::parse(text)?.floor())
            }
            (FieldType::Integer | FieldType::Date, MetaValue::Integer(number)) => {
                out.add_i64(field, *number)
            }
            (FieldType::Integer, MetaValue::Text(text)) => {
                let number = text
                    .trim()
                    .parse()
                    .map_err(|_| invalid(doc, format!("'{}' is not an integer for '{}'", text, name)))?;
                out.add_i64(field, number)
            }
            (FieldType::Annotated, _) => {
                return Err(invalid(doc, format!("annotated field '{}' given as metadata", name)));
            }
        }
    }

    for (name, stream) in &doc.fields {
        match config.field(name) {
            Some(f) if f.field_type == FieldType::Annotated => {}
            _ => return Err(invalid(doc, format!("'{}' is not an annotated field", name))),
        }
        let keys = stream.posting_keys(&config.sentence_element, &config.paragraph_element)?;
        out.add_text(schema.get_field(name)?, encode_positions(&keys));
        out.add_u64(schema.get_field(&length_field(name))?, stream.len() as u64);
        if let Some(offsets) = stream.offsets() {
            out.add_bytes(schema.get_field(&offsets_field(name))?, encode_offsets(&offsets).as_slice());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TokenStream;
    use crate::engine::config::FieldConfig;
    use crate::engine::schema::build_schema;
    use tantivy::schema::Value;

    fn config() -> IndexConfig {
        IndexConfig::with_fields(vec![
            FieldConfig::new("tokens", FieldType::Annotated),
            FieldConfig::new("pubDate", FieldType::Date),
            FieldConfig::new("pages", FieldType::Integer),
        ])
    }

    #[test]
    fn test_dates_are_stored_as_numbers() {
        let config = config();
        let schema = build_schema(&config).unwrap();
        let doc = AnnotatedDocument::new("a1")
            .with_meta("pubDate", MetaValue::Text("2005-03".to_string()))
            .with_meta("pages", MetaValue::Text("12".to_string()))
            .with_field("tokens", TokenStream::from_text("s:", "a b"));
        let converted = to_tantivy_document(&doc, &schema, &config).unwrap();
        let date = converted.get_first(schema.get_field("pubDate").unwrap()).and_then(|v| v.as_i64());
        assert_eq!(date, Some(20050300));
        let length = converted
            .get_first(schema.get_field("tokens_length").unwrap())
            .and_then(|v| v.as_u64());
        assert_eq!(length, Some(2));
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = config();
        let schema = build_schema(&config).unwrap();
        let bad_date = AnnotatedDocument::new("a").with_meta("pubDate", MetaValue::Text("March".to_string()));
        assert!(to_tantivy_document(&bad_date, &schema, &config).is_err());
        let not_annotated = AnnotatedDocument::new("a").with_field("pages", TokenStream::new());
        assert!(to_tantivy_document(&not_annotated, &schema, &config).is_err());
    }
}
