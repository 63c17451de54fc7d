//! Query evaluation over index segments.
//!
//! `search()` runs one iterator tree per segment on the rayon pool and merges
//! the per-segment lists in segment order. `evaluate()` is the lazy variant:
//! it walks the segments one after the other and yields matches on demand.

use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::collection::{Collection, CollectionCache};
use crate::engine::config::SearchConfig;
use crate::engine::constants::{UNIT_PARAGRAPHS, UNIT_SENTENCES, UNIT_TOKENS};
use crate::error::{Result, SearchError};
use crate::query::spans::SpanIterator;
use crate::query::SpanNode;
use crate::results::{Match, SearchResult};
use crate::search::context::{ContextSpec, ContextUnit};
use crate::search::filtered::FilteredSpans;
use crate::storage::SegmentStorage;
use crate::types::PositionSpan;

/// Everything `Evaluator::search` needs for one page of results
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: SpanNode,
    pub collection: Collection,
    pub start_index: usize,
    /// `0` selects the configured default
    pub page_size: usize,
    /// `None` selects the configured default token context
    pub context: Option<ContextSpec>,
    /// Stop counting once the requested page is complete
    pub cutoff: bool,
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    pub fn new(query: SpanNode) -> Self {
        Self {
            query,
            collection: Collection::new(),
            start_index: 0,
            page_size: 0,
            context: None,
            cutoff: false,
            timeout: None,
        }
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collection = collection;
        self
    }

    pub fn with_page(mut self, start_index: usize, page_size: usize) -> Self {
        self.start_index = start_index;
        self.page_size = page_size;
        self
    }

    pub fn with_context(mut self, context: ContextSpec) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_cutoff(mut self, cutoff: bool) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Default)]
struct SegmentOutcome {
    spans: Vec<PositionSpan>,
    total: u64,
    timed_out: bool,
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Query spans of `segment` restricted to the collection
fn open(
    segment: &dyn SegmentStorage,
    query: &SpanNode,
    collection: &Collection,
    cache: &CollectionCache,
) -> Result<FilteredSpans> {
    let bits = collection.bits(segment, cache)?;
    Ok(FilteredSpans::new(query.spans(segment)?, bits))
}

fn build_match(
    segment: &dyn SegmentStorage,
    field: Option<&str>,
    span: PositionSpan,
    config: &SearchConfig,
    context: &ContextSpec,
) -> Result<Match> {
    let truncated = span.width() > config.max_token_match_size;
    let end = if truncated {
        span.start + config.max_token_match_size
    } else {
        span.end
    };
    let wants_chars = context.left.unit == ContextUnit::Char || context.right.unit == ContextUnit::Char;
    let (length, offsets) = match field {
        Some(field) => {
            let offsets = if wants_chars {
                segment.char_offsets(field, span.doc)?
            } else {
                None
            };
            (segment.doc_length(field, span.doc)?, offsets)
        }
        None => (end, None),
    };
    let resolved = context.resolve(config, span.start, end, length, offsets.as_deref());
    let uid = segment
        .doc_uid(span.doc)?
        .unwrap_or_else(|| format!("{}-{}", segment.segment_ord(), span.doc));
    Ok(Match {
        uid,
        segment_ord: segment.segment_ord(),
        local_doc: span.doc,
        start: span.start,
        end,
        payload: span.payload,
        context_start: resolved.start,
        context_end: resolved.end,
        char_start: resolved.char_start,
        char_end: resolved.char_end,
        truncated,
    })
}

pub struct Evaluator {
    segments: Vec<Arc<dyn SegmentStorage>>,
    config: SearchConfig,
    cache: Arc<CollectionCache>,
}

impl Evaluator {
    pub fn new(
        segments: Vec<Arc<dyn SegmentStorage>>,
        config: SearchConfig,
        cache: Arc<CollectionCache>,
    ) -> Self {
        Self {
            segments,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn segments(&self) -> &[Arc<dyn SegmentStorage>] {
        &self.segments
    }

    /// Lazy sequence of matches from `start_index` on, at most one page long.
    ///
    /// Every call starts over at the first segment; earlier pages are
    /// re-scanned and skipped.
    pub fn evaluate(
        &self,
        query: &SpanNode,
        collection: &Collection,
        start_index: usize,
        page_size: usize,
        context: &ContextSpec,
    ) -> Result<MatchStream> {
        Ok(MatchStream {
            segments: self.segments.clone(),
            query: query.clone(),
            field: query.field().map(str::to_string),
            collection: collection.clone(),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
            context: *context,
            position: 0,
            current: None,
            to_skip: start_index,
            remaining: self.config.page_size(page_size),
            deadline: None,
            finished: false,
        })
    }

    /// One page of results with totals, segments evaluated in parallel
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let page_size = self.config.page_size(request.page_size);
        let context = request
            .context
            .unwrap_or_else(|| ContextSpec::from_config(&self.config));
        let deadline = request.timeout.map(|t| Instant::now() + t);
        let keep = request.start_index.saturating_add(page_size);
        let limit = request.cutoff.then(|| keep as u64 + 1);

        let outcomes: Vec<Result<SegmentOutcome>> = self
            .segments
            .par_iter()
            .map(|segment| self.collect_segment(segment.as_ref(), request, keep, limit, deadline))
            .collect();

        let mut result = SearchResult {
            start_index: request.start_index,
            items_per_page: page_size,
            cutoff: request.cutoff,
            ..Default::default()
        };
        let mut kept: Vec<(usize, PositionSpan)> = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(outcome) => {
                    result.total_results += outcome.total;
                    result.timed_out |= outcome.timed_out;
                    kept.extend(outcome.spans.into_iter().map(|span| (index, span)));
                }
                Err(err) if err.is_storage() => self.drop_segment(index, err, &mut result),
                Err(err) => return Err(err),
            }
        }

        let field = request.query.field();
        for (index, span) in kept.into_iter().skip(request.start_index).take(page_size) {
            if result.failed_segments.contains(&self.segments[index].segment_ord()) {
                continue;
            }
            let segment = self.segments[index].as_ref();
            match build_match(segment, field, span, &self.config, &context) {
                Ok(m) => result.matches.push(m),
                Err(err) if err.is_storage() => {
                    self.drop_segment(index, err, &mut result);
                    let ord = segment.segment_ord();
                    result.matches.retain(|m| m.segment_ord != ord);
                }
                Err(err) => return Err(err),
            }
        }
        log::debug!(
            "search returned {} of {} matches{}",
            result.matches.len(),
            result.total_results,
            if result.timed_out { " (timed out)" } else { "" }
        );
        Ok(result)
    }

    fn drop_segment(&self, index: usize, err: SearchError, result: &mut SearchResult) {
        let ord = self.segments[index].segment_ord();
        log::warn!("segment {} omitted from results: {}", ord, err);
        if !result.failed_segments.contains(&ord) {
            result.failed_segments.push(ord);
            result.warnings.push(err.report());
        }
    }

    fn collect_segment(
        &self,
        segment: &dyn SegmentStorage,
        request: &SearchRequest,
        keep: usize,
        limit: Option<u64>,
        deadline: Option<Instant>,
    ) -> Result<SegmentOutcome> {
        let mut outcome = SegmentOutcome::default();
        if expired(deadline) {
            outcome.timed_out = true;
            return Ok(outcome);
        }
        let mut spans = open(segment, &request.query, &request.collection, &self.cache)?;
        while spans.next()? {
            outcome.total += 1;
            if outcome.spans.len() < keep {
                outcome.spans.push(spans.span()?.clone());
            }
            if limit.is_some_and(|l| outcome.total >= l) {
                break;
            }
            if expired(deadline) {
                outcome.timed_out = true;
                break;
            }
        }
        log::debug!(
            "segment {}: {} matches{}",
            segment.segment_ord(),
            outcome.total,
            if outcome.timed_out { ", deadline reached" } else { "" }
        );
        Ok(outcome)
    }

    /// Number of documents, or of tokens, sentences or paragraphs of `field`,
    /// in the collection
    pub fn number_of(&self, collection: &Collection, field: &str, unit: &str) -> Result<u64> {
        let code = match unit {
            "documents" => None,
            "tokens" | UNIT_TOKENS => Some(UNIT_TOKENS),
            "sentences" | UNIT_SENTENCES => Some(UNIT_SENTENCES),
            "paragraphs" | UNIT_PARAGRAPHS => Some(UNIT_PARAGRAPHS),
            other => {
                return Err(SearchError::malformed(format!("unknown count unit '{}'", other)));
            }
        };
        self.segments
            .par_iter()
            .map(|segment| {
                let bits = collection.bits(segment.as_ref(), &self.cache)?;
                let Some(code) = code else {
                    return Ok(bits.len());
                };
                Ok(segment
                    .doc_counts(field, code)?
                    .into_iter()
                    .filter(|(doc, _)| bits.contains(*doc))
                    .map(|(_, count)| count)
                    .sum())
            })
            .collect::<Vec<Result<u64>>>()
            .into_iter()
            .sum()
    }
}

/// Matches produced on demand, segment by segment
pub struct MatchStream {
    segments: Vec<Arc<dyn SegmentStorage>>,
    query: SpanNode,
    field: Option<String>,
    collection: Collection,
    cache: Arc<CollectionCache>,
    config: SearchConfig,
    context: ContextSpec,
    position: usize,
    current: Option<(Arc<dyn SegmentStorage>, FilteredSpans)>,
    to_skip: usize,
    remaining: usize,
    deadline: Option<Instant>,
    finished: bool,
}

impl MatchStream {
    /// Yield `SearchError::Cancelled` once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl Iterator for MatchStream {
    type Item = Result<Match>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished || self.remaining == 0 {
                return None;
            }
            if expired(self.deadline) {
                self.finished = true;
                return Some(Err(SearchError::Cancelled));
            }
            if self.current.is_none() {
                let segment = Arc::clone(self.segments.get(self.position)?);
                self.position += 1;
                match open(segment.as_ref(), &self.query, &self.collection, &self.cache) {
                    Ok(spans) => self.current = Some((segment, spans)),
                    Err(err) if err.is_storage() => {
                        log::warn!("segment {} skipped: {}", segment.segment_ord(), err);
                        continue;
                    }
                    Err(err) => {
                        self.finished = true;
                        return Some(Err(err));
                    }
                }
            }
            let Some((segment, spans)) = self.current.as_mut() else {
                continue;
            };
            match spans.next() {
                Ok(true) => {}
                Ok(false) => {
                    self.current = None;
                    continue;
                }
                Err(err) if err.is_storage() => {
                    log::warn!("segment {} abandoned: {}", segment.segment_ord(), err);
                    self.current = None;
                    continue;
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            self.remaining -= 1;
            let span = match spans.span() {
                Ok(span) => span.clone(),
                Err(err) => return Some(Err(err)),
            };
            return Some(build_match(
                segment.as_ref(),
                self.field.as_deref(),
                span,
                &self.config,
                &self.context,
            ));
        }
    }
}
