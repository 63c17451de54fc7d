//! The span iterator contract and the document-at-a-time machinery shared by
//! all combinators.
//!
//! A combinator never looks at more than one document of its children at a
//! time: it aligns its operands on a document, drains every operand span of
//! that document into a candidate list, and emits the matches of that
//! document in position order. Skipping forward drops all candidates of
//! earlier documents.

use std::collections::VecDeque;

use crate::error::{Result, SearchError};
use crate::types::{DocId, PayloadEntry, PositionSpan};

/// Cursor over the spans of one index segment, in `(doc, start, end)` order
pub trait SpanIterator {
    /// Advance to the next span. `false` marks exhaustion.
    fn next(&mut self) -> Result<bool>;

    /// Advance to the first span with `doc >= target`.
    ///
    /// When the current span already lies in `target` or later, nothing moves.
    fn skip_to(&mut self, target: DocId) -> Result<bool>;

    /// The current span, `None` before the first advance and after exhaustion
    fn current(&self) -> Option<&PositionSpan>;

    /// Estimate of the remaining number of spans
    fn cost(&self) -> u64;

    fn span(&self) -> Result<&PositionSpan> {
        self.current()
            .ok_or_else(|| SearchError::illegal_state("span accessed outside a successful advance"))
    }

    fn doc(&self) -> Result<DocId> {
        Ok(self.span()?.doc)
    }

    fn start(&self) -> Result<u32> {
        Ok(self.span()?.start)
    }

    fn end(&self) -> Result<u32> {
        Ok(self.span()?.end)
    }

    fn payload(&self) -> Result<&[PayloadEntry]> {
        Ok(&self.span()?.payload)
    }
}

/// Computes the matches of one document for a combinator
pub trait DocMatcher {
    /// Matches of the first document `>= target` that has any; `None` when
    /// the operands are exhausted. All returned spans share one document.
    fn match_from(&mut self, target: DocId) -> Result<Option<Vec<PositionSpan>>>;

    fn cost(&self) -> u64;

    /// Whether emitted spans are re-sorted within the document
    fn sorted(&self) -> bool {
        true
    }
}

/// Turns a `DocMatcher` into a `SpanIterator` by buffering one document
pub struct BufferedSpans<M: DocMatcher> {
    matcher: M,
    buffer: VecDeque<PositionSpan>,
    current: Option<PositionSpan>,
    next_doc: DocId,
    exhausted: bool,
}

impl<M: DocMatcher> BufferedSpans<M> {
    pub fn new(matcher: M) -> Self {
        Self {
            matcher,
            buffer: VecDeque::new(),
            current: None,
            next_doc: 0,
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        match self.matcher.match_from(self.next_doc)? {
            Some(mut spans) if !spans.is_empty() => {
                if self.matcher.sorted() {
                    spans.sort();
                }
                let doc = spans[0].doc;
                self.exhausted = doc == DocId::MAX;
                self.next_doc = doc.saturating_add(1);
                self.buffer = spans.into();
            }
            _ => self.exhausted = true,
        }
        Ok(())
    }
}

impl<M: DocMatcher> SpanIterator for BufferedSpans<M> {
    fn next(&mut self) -> Result<bool> {
        loop {
            if let Some(span) = self.buffer.pop_front() {
                self.current = Some(span);
                return Ok(true);
            }
            if self.exhausted {
                self.current = None;
                return Ok(false);
            }
            self.fill()?;
        }
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(current) = &self.current {
            if current.doc >= target {
                return Ok(true);
            }
        }
        if self.buffer.front().is_some_and(|s| s.doc < target) {
            self.buffer.clear();
        }
        if self.buffer.is_empty() && target > self.next_doc {
            self.next_doc = target;
        }
        self.next()
    }

    fn current(&self) -> Option<&PositionSpan> {
        self.current.as_ref()
    }

    fn cost(&self) -> u64 {
        self.matcher.cost()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Fresh,
    Positioned,
    Exhausted,
}

/// Operand handle of a combinator: positions on documents and drains them
pub struct DocCursor {
    inner: Box<dyn SpanIterator>,
    state: CursorState,
}

impl DocCursor {
    pub fn new(inner: Box<dyn SpanIterator>) -> Self {
        Self {
            inner,
            state: CursorState::Fresh,
        }
    }

    /// Document of the current span, if positioned
    pub fn doc(&self) -> Option<DocId> {
        match self.state {
            CursorState::Positioned => self.inner.current().map(|s| s.doc),
            _ => None,
        }
    }

    pub fn cost(&self) -> u64 {
        match self.state {
            CursorState::Exhausted => 0,
            _ => self.inner.cost(),
        }
    }

    /// Position on the first span with `doc >= target` and return its document
    pub fn seek(&mut self, target: DocId) -> Result<Option<DocId>> {
        match self.state {
            CursorState::Exhausted => return Ok(None),
            CursorState::Fresh => {
                self.state = if self.inner.skip_to(target)? {
                    CursorState::Positioned
                } else {
                    CursorState::Exhausted
                };
            }
            CursorState::Positioned => {
                if self.doc().is_some_and(|doc| doc < target) && !self.inner.skip_to(target)? {
                    self.state = CursorState::Exhausted;
                }
            }
        }
        Ok(self.doc())
    }

    /// Every span of the current document; leaves the cursor on the next one
    pub fn take_doc(&mut self) -> Result<Vec<PositionSpan>> {
        let Some(doc) = self.doc() else {
            return Ok(Vec::new());
        };
        let mut spans = Vec::new();
        loop {
            match self.inner.current() {
                Some(span) if span.doc == doc => spans.push(span.clone()),
                _ => break,
            }
            if !self.inner.next()? {
                self.state = CursorState::Exhausted;
                break;
            }
        }
        Ok(spans)
    }

    /// Spans of `doc` if the cursor can be positioned exactly there
    pub fn take_if_at(&mut self, doc: DocId) -> Result<Vec<PositionSpan>> {
        if self.seek(doc)? == Some(doc) {
            self.take_doc()
        } else {
            Ok(Vec::new())
        }
    }
}

/// Position all cursors on the first document `>= target` they share
pub fn align(cursors: &mut [&mut DocCursor], mut target: DocId) -> Result<Option<DocId>> {
    cursors.sort_by_key(|c| c.cost());
    'outer: loop {
        for cursor in cursors.iter_mut() {
            match cursor.seek(target)? {
                None => return Ok(None),
                Some(doc) if doc > target => {
                    target = doc;
                    continue 'outer;
                }
                Some(_) => {}
            }
        }
        return Ok(Some(target));
    }
}

/// Payload of `first` followed by payload of `second`
pub fn concat_payload(first: &PositionSpan, second: &PositionSpan) -> Vec<PayloadEntry> {
    let mut payload = Vec::with_capacity(first.payload.len() + second.payload.len());
    payload.extend(first.payload.iter().cloned());
    payload.extend(second.payload.iter().cloned());
    payload
}

/// In-memory span source, used by combinator tests and empty operands
pub struct VecSpans {
    spans: Vec<PositionSpan>,
    index: usize,
    started: bool,
}

impl VecSpans {
    pub fn new(mut spans: Vec<PositionSpan>) -> Self {
        spans.sort();
        Self {
            spans,
            index: 0,
            started: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl SpanIterator for VecSpans {
    fn next(&mut self) -> Result<bool> {
        if self.started {
            self.index += 1;
        } else {
            self.started = true;
        }
        Ok(self.index < self.spans.len())
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if let Some(current) = self.current() {
            if current.doc >= target {
                return Ok(true);
            }
        }
        if !self.started {
            self.started = true;
        }
        while self.index < self.spans.len() && self.spans[self.index].doc < target {
            self.index += 1;
        }
        Ok(self.index < self.spans.len())
    }

    fn current(&self) -> Option<&PositionSpan> {
        if self.started {
            self.spans.get(self.index)
        } else {
            None
        }
    }

    fn cost(&self) -> u64 {
        self.spans.len().saturating_sub(self.index) as u64
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn spans(doc: DocId, positions: &[(u32, u32)]) -> Vec<PositionSpan> {
        positions
            .iter()
            .map(|(s, e)| PositionSpan::new(doc, *s, *e))
            .collect()
    }

    pub(crate) fn boxed(spans: Vec<PositionSpan>) -> Box<dyn SpanIterator> {
        Box::new(VecSpans::new(spans))
    }

    pub(crate) fn drain(mut iter: Box<dyn SpanIterator>) -> Vec<(DocId, u32, u32)> {
        let mut out = Vec::new();
        while iter.next().unwrap() {
            let span = iter.span().unwrap();
            out.push((span.doc, span.start, span.end));
        }
        out
    }

    #[test]
    fn test_vec_spans_skip_to_keeps_current_doc() {
        let mut iter = VecSpans::new(vec![
            PositionSpan::new(0, 0, 1),
            PositionSpan::new(2, 1, 2),
            PositionSpan::new(2, 3, 4),
            PositionSpan::new(5, 0, 1),
        ]);
        assert!(iter.skip_to(1).unwrap());
        assert_eq!(iter.doc().unwrap(), 2);
        assert_eq!(iter.start().unwrap(), 1);
        assert!(iter.skip_to(2).unwrap());
        assert_eq!(iter.start().unwrap(), 1);
        assert!(iter.skip_to(3).unwrap());
        assert_eq!(iter.doc().unwrap(), 5);
        assert!(!iter.next().unwrap());
    }

    #[test]
    fn test_cursor_drains_whole_documents() {
        let mut cursor = DocCursor::new(boxed(vec![
            PositionSpan::new(1, 0, 1),
            PositionSpan::new(1, 4, 5),
            PositionSpan::new(3, 2, 3),
        ]));
        assert_eq!(cursor.seek(0).unwrap(), Some(1));
        assert_eq!(cursor.take_doc().unwrap().len(), 2);
        assert_eq!(cursor.doc(), Some(3));
        assert!(cursor.take_if_at(2).unwrap().is_empty());
        assert_eq!(cursor.take_if_at(3).unwrap().len(), 1);
        assert_eq!(cursor.seek(4).unwrap(), None);
    }

    #[test]
    fn test_align_finds_shared_document() {
        let mut a = DocCursor::new(boxed(spans(0, &[(0, 1)]).into_iter().chain(spans(4, &[(0, 1)])).chain(spans(7, &[(1, 2)])).collect()));
        let mut b = DocCursor::new(boxed(spans(2, &[(0, 1)]).into_iter().chain(spans(7, &[(3, 4)])).collect()));
        assert_eq!(align(&mut [&mut a, &mut b], 0).unwrap(), Some(7));
        a.take_doc().unwrap();
        b.take_doc().unwrap();
        assert_eq!(align(&mut [&mut a, &mut b], 8).unwrap(), None);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn test_access_before_advance_is_a_contract_violation() {
        let iter = VecSpans::empty();
        let _ = iter.doc();
    }
}
