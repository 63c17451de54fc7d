use crate::error::Result;
use crate::query::spans::SpanIterator;
use crate::types::{Bitmask, DocId, PositionSpan};

/// Restricts a span iterator to the documents of a collection bitmask
pub struct FilteredSpans {
    inner: Box<dyn SpanIterator>,
    bits: Bitmask,
    exhausted: bool,
}

impl FilteredSpans {
    pub fn new(inner: Box<dyn SpanIterator>, bits: Bitmask) -> Self {
        let exhausted = bits.is_empty();
        Self {
            inner,
            bits,
            exhausted,
        }
    }

    /// Move forward until the current span lies in an accepted document
    fn settle(&mut self, mut found: bool) -> Result<bool> {
        while found {
            let doc = self.inner.doc()?;
            if self.bits.contains(doc) {
                return Ok(true);
            }
            match self.bits.next_set(doc) {
                Some(next) => found = self.inner.skip_to(next)?,
                None => found = false,
            }
        }
        self.exhausted = true;
        Ok(false)
    }
}

impl SpanIterator for FilteredSpans {
    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let found = if self.inner.current().is_none() {
            match self.bits.next_set(0) {
                Some(first) => self.inner.skip_to(first)?,
                None => false,
            }
        } else {
            self.inner.next()?
        };
        self.settle(found)
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if let Some(current) = self.inner.current() {
            if current.doc >= target {
                return Ok(true);
            }
        }
        let found = match self.bits.next_set(target) {
            Some(next) => self.inner.skip_to(next)?,
            None => false,
        };
        self.settle(found)
    }

    fn current(&self) -> Option<&PositionSpan> {
        if self.exhausted {
            None
        } else {
            self.inner.current()
        }
    }

    fn cost(&self) -> u64 {
        self.inner.cost().min(self.bits.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::spans::tests::{boxed, drain, spans};

    fn fixture() -> Box<dyn SpanIterator> {
        let mut all = spans(0, &[(0, 1), (2, 3)]);
        all.extend(spans(2, &[(1, 2)]));
        all.extend(spans(3, &[(0, 1), (4, 5)]));
        all.extend(spans(7, &[(3, 4)]));
        boxed(all)
    }

    #[test]
    fn test_only_collection_documents_survive() {
        let filtered = FilteredSpans::new(fixture(), Bitmask::from_docs(8, [0, 3, 5]));
        assert_eq!(drain(Box::new(filtered)), vec![(0, 0, 1), (0, 2, 3), (3, 0, 1), (3, 4, 5)]);
    }

    #[test]
    fn test_empty_and_full_collections() {
        assert!(drain(Box::new(FilteredSpans::new(fixture(), Bitmask::empty(8)))).is_empty());
        assert_eq!(drain(Box::new(FilteredSpans::new(fixture(), Bitmask::full(8)))).len(), 6);
    }

    #[test]
    fn test_skip_to_respects_bitmask() {
        let mut filtered = FilteredSpans::new(fixture(), Bitmask::from_docs(8, [2, 7]));
        assert!(filtered.skip_to(3).unwrap());
        assert_eq!(filtered.doc().unwrap(), 7);
        assert!(!filtered.next().unwrap());
        assert!(filtered.current().is_none());
    }
}
