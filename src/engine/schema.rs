//! Tantivy schema built from the index configuration

use tantivy::schema::{
    IndexRecordOption, NumericOptions, Schema, SchemaBuilder, TextFieldIndexing, TextOptions,
    FAST, INDEXED, STORED, STRING, TEXT,
};

use crate::engine::config::{FieldConfig, FieldType, IndexConfig};
use crate::engine::constants::{length_field, offsets_field, ANNOTATION_TOKENIZER};
use crate::error::Result;

pub fn build_schema(config: &IndexConfig) -> Result<Schema> {
    config.validate()?;
    let mut builder = Schema::builder();
    builder.add_text_field(&config.uid_field, STRING | STORED);
    for field in &config.fields {
        add_field_to_schema(&mut builder, field);
    }
    Ok(builder.build())
}

fn add_field_to_schema(builder: &mut SchemaBuilder, field: &FieldConfig) {
    match field.field_type {
        FieldType::Annotated => add_annotated_field(builder, field),
        FieldType::Keyword => {
            let options = if field.stored { STRING | STORED } else { STRING };
            builder.add_text_field(&field.name, options);
        }
        FieldType::Text => {
            let options = if field.stored { TEXT | STORED } else { TEXT };
            builder.add_text_field(&field.name, options);
        }
        FieldType::Date | FieldType::Integer => {
            let mut options = NumericOptions::from(INDEXED | FAST);
            if field.stored {
                options = options.set_stored();
            }
            builder.add_i64_field(&field.name, options);
        }
    }
}

fn add_annotated_field(builder: &mut SchemaBuilder, field: &FieldConfig) {
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(ANNOTATION_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let mut options = TextOptions::default().set_indexing_options(indexing);
    if field.stored {
        options = options.set_stored();
    }
    builder.add_text_field(&field.name, options);
    builder.add_u64_field(&length_field(&field.name), FAST | STORED);
    builder.add_bytes_field(&offsets_field(&field.name), STORED);
    log::debug!("Added annotated field '{}' with position-aware tokenizer", field.name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_field_gets_companions() {
        let config = IndexConfig::with_fields(vec![
            FieldConfig::new("tokens", FieldType::Annotated),
            FieldConfig::new("pubDate", FieldType::Date),
            FieldConfig::new("textSigle", FieldType::Keyword).stored(),
        ]);
        let schema = build_schema(&config).unwrap();
        for name in ["UID", "tokens", "tokens_length", "tokens_offsets", "pubDate", "textSigle"] {
            assert!(schema.get_field(name).is_ok(), "missing {}", name);
        }
        let date = schema.get_field("pubDate").unwrap();
        assert!(schema.get_field_entry(date).is_fast());
    }
}
