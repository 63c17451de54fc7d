//! Core SpanIndex struct: index lifecycle and per-segment search access

use std::path::Path;
use std::sync::Arc;
use tantivy::{
    directory::MmapDirectory,
    indexer::NoMergePolicy,
    schema::{Field, Schema},
    Index, IndexReader, IndexWriter, ReloadPolicy, Term,
};

use crate::collection::{Collection, CollectionBuilder, CollectionCache};
use crate::data::AnnotatedDocument;
use crate::engine::config::EngineConfig;
use crate::engine::constants::ANNOTATION_TOKENIZER;
use crate::engine::document::to_tantivy_document;
use crate::engine::schema::build_schema;
use crate::error::{Result, SearchError};
use crate::results::SearchResult;
use crate::search::{Evaluator, SearchRequest};
use crate::storage::SegmentStorage;
use crate::tantivy_integration::{AnnotationTokenizer, TantivySegment};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Annotated-corpus index searched with span queries
pub struct SpanIndex {
    index: Index,
    reader: IndexReader,
    writer: Option<IndexWriter>,
    schema: Schema,
    uid_field: Field,
    config: EngineConfig,
    cache: Arc<CollectionCache>,
}

impl SpanIndex {
    pub fn create_in_ram(config: EngineConfig) -> Result<Self> {
        let schema = build_schema(&config.index)?;
        let index = Index::create_in_ram(schema.clone());
        log::info!("Created in-memory index");
        Self::from_index(index, schema, config)
    }

    /// Open the index stored in `index_dir`, creating it if needed
    pub fn open_in_dir(index_dir: &Path, config: EngineConfig) -> Result<Self> {
        let schema = build_schema(&config.index)?;
        std::fs::create_dir_all(index_dir)?;
        let dir = MmapDirectory::open(index_dir).map_err(tantivy::TantivyError::from)?;
        let index = Index::open_or_create(dir, schema.clone())?;
        log::info!("Opened index at {}", index_dir.display());
        Self::from_index(index, schema, config)
    }

    fn from_index(index: Index, schema: Schema, config: EngineConfig) -> Result<Self> {
        Self::register_tokenizers(&index);
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = Self::try_create_writer(&index)?;
        let uid_field = schema.get_field(&config.index.uid_field)?;
        Ok(Self {
            index,
            reader,
            writer,
            schema,
            uid_field,
            config,
            cache: Arc::new(CollectionCache::new()),
        })
    }

    fn register_tokenizers(index: &Index) {
        index
            .tokenizers()
            .register(ANNOTATION_TOKENIZER, AnnotationTokenizer);
        log::info!("Registered position-aware '{}' tokenizer", ANNOTATION_TOKENIZER);
    }

    /// A single indexing thread, so that each commit adds exactly one segment
    fn try_create_writer(index: &Index) -> Result<Option<IndexWriter>> {
        match index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET) {
            Ok(writer) => {
                writer.set_merge_policy(Box::new(NoMergePolicy));
                Ok(Some(writer))
            }
            Err(tantivy::TantivyError::LockFailure(e, _)) => {
                log::warn!("Could not acquire index lock, running in READ-ONLY mode: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn writer(&mut self) -> Result<&mut IndexWriter> {
        self.writer
            .as_mut()
            .ok_or_else(|| SearchError::Config("index is open in read-only mode".to_string()))
    }

    pub fn add_document(&mut self, document: &AnnotatedDocument) -> Result<()> {
        let converted = to_tantivy_document(document, &self.schema, &self.config.index)?;
        self.writer()?.add_document(converted)?;
        Ok(())
    }

    pub fn add_documents(&mut self, documents: &[AnnotatedDocument]) -> Result<()> {
        for document in documents {
            self.add_document(document)?;
        }
        Ok(())
    }

    /// Mark every document with this uid as deleted, effective on commit
    pub fn delete_document(&mut self, uid: &str) -> Result<()> {
        let term = Term::from_field_text(self.uid_field, uid);
        self.writer()?.delete_term(term);
        Ok(())
    }

    /// Persist pending changes; added documents form a new segment
    pub fn commit(&mut self) -> Result<()> {
        let opstamp = self.writer()?.commit()?;
        self.reader.reload()?;
        self.cache.clear();
        log::info!(
            "Committed opstamp {}: {} docs in {} segments",
            opstamp,
            self.num_docs(),
            self.reader.searcher().segment_readers().len()
        );
        Ok(())
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    /// Builder whose named collections live in this index's cache
    pub fn collection_builder(&self) -> CollectionBuilder {
        CollectionBuilder::with_cache(Arc::clone(&self.cache))
    }

    /// Storage view of every segment of the current reader, in segment order
    pub fn segments(&self) -> Result<Vec<Arc<dyn SegmentStorage>>> {
        let searcher = self.reader.searcher();
        searcher
            .segment_readers()
            .iter()
            .enumerate()
            .map(|(ord, reader)| {
                let segment = TantivySegment::new(
                    ord as u32,
                    reader,
                    &self.schema,
                    &self.config.index.uid_field,
                    self.index.tokenizers(),
                )?;
                Ok(Arc::new(segment) as Arc<dyn SegmentStorage>)
            })
            .collect()
    }

    pub fn evaluator(&self) -> Result<Evaluator> {
        Ok(Evaluator::new(
            self.segments()?,
            self.config.search.clone(),
            Arc::clone(&self.cache),
        ))
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        self.evaluator()?.search(request)
    }

    /// Count of `unit` (`documents`, `tokens`, `sentences`, `paragraphs`) in the collection
    pub fn number_of(&self, collection: &Collection, field: &str, unit: &str) -> Result<u64> {
        self.evaluator()?.number_of(collection, field, unit)
    }
}
