//! `SegmentStorage` over one tantivy segment.

use tantivy::query::{EnableScoring, PhraseQuery, Query, RangeQuery, RegexQuery, TermQuery};
use tantivy::schema::{Field, FieldType, IndexRecordOption, Schema, Value};
use tantivy::store::StoreReader;
use tantivy::tokenizer::{TokenStream, TokenizerManager};
use tantivy::{DocSet, SegmentReader, TantivyDocument, Term, TERMINATED};
use std::ops::Bound;

use crate::engine::constants::{length_field, meta_term, offsets_field, KEY_SEPARATOR};
use crate::error::{Result, SearchError};
use crate::query::spans::{BufferedSpans, SpanIterator};
use crate::storage::{LeafPredicate, SegmentStorage};
use crate::tantivy_integration::offsets::decode_offsets;
use crate::tantivy_integration::posting_key::PostingKey;
use crate::tantivy_integration::term_spans::{KeyedPostings, TermPostings};
use crate::types::{Bitmask, DocId};

/// Upper bound on posting keys a single term may expand to
const MAX_KEY_EXPANSION: usize = 100_000;

pub struct TantivySegment {
    ord: u32,
    reader: SegmentReader,
    store: StoreReader,
    schema: Schema,
    uid_field: Field,
    tokenizers: TokenizerManager,
}

impl TantivySegment {
    pub fn new(
        ord: u32,
        reader: &SegmentReader,
        schema: &Schema,
        uid_field: &str,
        tokenizers: &TokenizerManager,
    ) -> Result<Self> {
        let uid_field = schema.get_field(uid_field)?;
        Ok(Self {
            ord,
            store: reader.get_store_reader(10)?,
            reader: reader.clone(),
            schema: schema.clone(),
            uid_field,
            tokenizers: tokenizers.clone(),
        })
    }

    fn field(&self, name: &str) -> Result<Field> {
        self.schema
            .get_field(name)
            .map_err(|_| SearchError::malformed(format!("unknown field '{}'", name)))
    }

    /// Every posting key stored for `term`, with its postings
    fn expand(&self, field: Field, term: &str) -> Result<Vec<KeyedPostings>> {
        let inverted_index = self.reader.inverted_index(field)?;
        let term_dict = inverted_index.terms();
        let pattern = format!("{}({}.*)?", regex::escape(term), KEY_SEPARATOR);
        let automaton = tantivy_fst::Regex::new(&pattern)
            .map_err(|e| SearchError::malformed(format!("unusable term '{}': {}", term, e)))?;
        let mut stream = term_dict.search(&automaton).into_stream()?;

        let mut keys = Vec::new();
        while stream.advance() {
            if keys.len() >= MAX_KEY_EXPANSION {
                log::warn!("term '{}' exceeds {} posting keys, truncating", term, MAX_KEY_EXPANSION);
                break;
            }
            let Ok(text) = std::str::from_utf8(stream.key()) else {
                continue;
            };
            let Some(key) = PostingKey::parse(text) else {
                log::warn!("skipping unreadable posting key {:?}", text);
                continue;
            };
            let indexed = Term::from_field_text(field, text);
            if let Some(postings) =
                inverted_index.read_postings(&indexed, IndexRecordOption::WithFreqsAndPositions)?
            {
                keys.push(KeyedPostings::new(key, postings));
            }
        }
        log::debug!(
            "segment {}: term '{}' expanded to {} posting keys",
            self.ord,
            term,
            keys.len()
        );
        Ok(keys)
    }

    /// Indexed terms of `text` in `field`, as the field's analyzer produces them
    fn analyze(&self, field: Field, text: &str) -> Result<Vec<Term>> {
        let entry = self.schema.get_field_entry(field);
        let indexing = match entry.field_type() {
            FieldType::Str(options) => options.get_indexing_options(),
            _ => None,
        };
        let Some(indexing) = indexing else {
            return Err(SearchError::malformed(format!(
                "text predicate over non-text field '{}'",
                entry.name()
            )));
        };
        let mut analyzer = self.tokenizers.get(indexing.tokenizer()).ok_or_else(|| {
            SearchError::Config(format!("tokenizer '{}' is not registered", indexing.tokenizer()))
        })?;
        let mut terms = Vec::new();
        let mut tokens = analyzer.token_stream(text);
        tokens.process(&mut |token| terms.push(Term::from_field_text(field, &token.text)));
        Ok(terms)
    }

    fn stored(&self, doc: DocId) -> Result<TantivyDocument> {
        Ok(self.store.get::<TantivyDocument>(doc)?)
    }

    fn leaf_query(&self, predicate: &LeafPredicate) -> Result<Option<Box<dyn Query>>> {
        let query: Box<dyn Query> = match predicate {
            LeafPredicate::Nothing => return Ok(None),
            LeafPredicate::Term { field, value } => Box::new(TermQuery::new(
                Term::from_field_text(self.field(field)?, value),
                IndexRecordOption::Basic,
            )),
            LeafPredicate::Regex { field, pattern } => {
                Box::new(RegexQuery::from_pattern(pattern, self.field(field)?)?)
            }
            LeafPredicate::Text { field, words } => {
                let mut terms = self.analyze(self.field(field)?, &words.join(" "))?;
                match terms.len() {
                    0 => return Ok(None),
                    1 => Box::new(TermQuery::new(terms.remove(0), IndexRecordOption::Basic)),
                    _ => Box::new(PhraseQuery::new(terms)),
                }
            }
            LeafPredicate::Range { field, lower, upper } => {
                let field = self.field(field)?;
                if !matches!(self.schema.get_field_entry(field).field_type(), FieldType::I64(_)) {
                    return Err(SearchError::malformed(format!(
                        "range over non-integer field '{}'",
                        self.schema.get_field_name(field)
                    )));
                }
                Box::new(RangeQuery::new(
                    Bound::Included(Term::from_field_i64(field, *lower)),
                    Bound::Included(Term::from_field_i64(field, *upper)),
                ))
            }
        };
        Ok(Some(query))
    }
}

impl SegmentStorage for TantivySegment {
    fn segment_ord(&self) -> u32 {
        self.ord
    }

    fn segment_key(&self) -> String {
        format!(
            "{}:{}",
            self.reader.segment_id().uuid_string(),
            self.reader.num_deleted_docs()
        )
    }

    fn max_doc(&self) -> u32 {
        self.reader.max_doc()
    }

    fn live_docs(&self) -> Bitmask {
        Bitmask::from_docs(self.reader.max_doc(), self.reader.doc_ids_alive())
    }

    fn postings(&self, field: &str, term: &str) -> Result<Box<dyn SpanIterator>> {
        let keys = self.expand(self.field(field)?, term)?;
        Ok(Box::new(BufferedSpans::new(TermPostings::new(keys))))
    }

    fn doc_id_set(&self, predicate: &LeafPredicate) -> Result<Bitmask> {
        let mut docs = Bitmask::empty(self.max_doc());
        let Some(query) = self.leaf_query(predicate)? else {
            return Ok(docs);
        };
        let weight = query.weight(EnableScoring::disabled_from_schema(&self.schema))?;
        let mut scorer = weight.scorer(&self.reader, 1.0)?;
        let mut doc = scorer.doc();
        while doc != TERMINATED {
            docs.insert(doc);
            doc = scorer.advance();
        }
        log::debug!("segment {}: {:?} selects {} docs", self.ord, predicate, docs.len());
        Ok(docs)
    }

    fn doc_uid(&self, doc: DocId) -> Result<Option<String>> {
        let stored = self.stored(doc)?;
        Ok(stored
            .get_first(self.uid_field)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn doc_length(&self, field: &str, doc: DocId) -> Result<u32> {
        let column = self.reader.fast_fields().u64(&length_field(field))?;
        Ok(column.first(doc).unwrap_or(0) as u32)
    }

    fn char_offsets(&self, field: &str, doc: DocId) -> Result<Option<Vec<(u32, u32)>>> {
        let offsets = self.field(&offsets_field(field))?;
        let stored = self.stored(doc)?;
        Ok(stored
            .get_first(offsets)
            .and_then(|v| v.as_bytes())
            .filter(|bytes| !bytes.is_empty())
            .and_then(decode_offsets))
    }

    fn doc_counts(&self, field: &str, unit: &str) -> Result<Vec<(DocId, u64)>> {
        let mut counts = Vec::new();
        for mut keyed in self.expand(self.field(field)?, &meta_term(unit))? {
            let count = keyed.key().count.unwrap_or(0);
            let postings = keyed.postings_mut();
            let mut doc = postings.doc();
            while doc != TERMINATED {
                counts.push((doc, count));
                doc = postings.advance();
            }
        }
        counts.sort_unstable();
        Ok(counts)
    }
}
