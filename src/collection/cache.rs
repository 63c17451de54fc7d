//! Named collections and their per-segment bitmasks.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::collection::builder::Predicate;
use crate::error::{Result, SearchError};
use crate::storage::SegmentStorage;
use crate::types::Bitmask;

type Slot = Arc<Mutex<Option<Bitmask>>>;

/// Shared between searches. Each `(name, segment)` bitmask is computed once;
/// a second requester blocks on the slot until the first one is done.
#[derive(Default)]
pub struct CollectionCache {
    definitions: RwLock<HashMap<String, Predicate>>,
    slots: Mutex<HashMap<(String, String), Slot>>,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a named collection. Replacing drops its bitmasks.
    ///
    /// Fails when `predicate` leads back to `key` through the named
    /// collections already defined.
    pub fn define(&self, key: &str, predicate: Predicate) -> Result<()> {
        let replaced = {
            let mut definitions = self.definitions.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(path) = cycle_through(&definitions, key, &predicate) {
                return Err(SearchError::malformed(format!(
                    "named collection '{}' refers to itself via {}",
                    key,
                    path.join(" -> ")
                )));
            }
            definitions.insert(key.to_string(), predicate).is_some()
        };
        if replaced {
            self.slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(name, _), _| name != key);
        }
        log::debug!("defined named collection '{}'", key);
        Ok(())
    }

    pub fn is_defined(&self, key: &str) -> bool {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn definition(&self, key: &str) -> Result<Predicate> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| SearchError::malformed(format!("unknown named collection '{}'", key)))
    }

    fn slot(&self, key: &str, segment: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry((key.to_string(), segment.to_string()))
                .or_default(),
        )
    }

    /// Bitmask of the named collection `key` in `segment`
    pub fn bits(&self, key: &str, segment: &dyn SegmentStorage) -> Result<Bitmask> {
        let predicate = self.definition(key)?;
        let slot = self.slot(key, &segment.segment_key());
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bits) = cached.as_ref() {
            log::trace!("named collection '{}' served from cache", key);
            return Ok(bits.clone());
        }
        let bits = predicate.bits(segment, self)?;
        log::debug!(
            "named collection '{}' holds {} docs in segment {}",
            key,
            bits.len(),
            segment.segment_ord()
        );
        *cached = Some(bits.clone());
        Ok(bits)
    }

    /// Number of materialised bitmasks
    pub fn cached_len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.try_lock().map(|s| s.is_some()).unwrap_or(false))
            .count()
    }

    /// Drop every computed bitmask, keeping the definitions
    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Chain of names from `key` back to itself, if defining `key` as `predicate` closes a loop
fn cycle_through<'a>(
    definitions: &'a HashMap<String, Predicate>,
    key: &'a str,
    predicate: &'a Predicate,
) -> Option<Vec<&'a str>> {
    let mut seen = HashSet::new();
    let mut pending: Vec<Vec<&str>> = predicate
        .cached_names()
        .into_iter()
        .map(|name| vec![key, name])
        .collect();
    while let Some(path) = pending.pop() {
        let Some(&name) = path.last() else {
            continue;
        };
        if name == key {
            return Some(path);
        }
        if !seen.insert(name) {
            continue;
        }
        if let Some(next) = definitions.get(name) {
            for referenced in next.cached_names() {
                let mut longer = path.clone();
                longer.push(referenced);
                pending.push(longer);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::builder::CollectionBuilder;
    use crate::query::spans::SpanIterator;
    use crate::storage::LeafPredicate;
    use crate::types::DocId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Segment answering every term predicate with docs 1 and 3, counting calls
    struct CountingSegment {
        calls: AtomicUsize,
    }

    impl SegmentStorage for CountingSegment {
        fn segment_ord(&self) -> u32 {
            0
        }
        fn segment_key(&self) -> String {
            "counting:0".to_string()
        }
        fn max_doc(&self) -> u32 {
            5
        }
        fn live_docs(&self) -> Bitmask {
            Bitmask::full(5)
        }
        fn postings(&self, _: &str, _: &str) -> Result<Box<dyn SpanIterator>> {
            Ok(Box::new(crate::query::VecSpans::empty()))
        }
        fn doc_id_set(&self, predicate: &LeafPredicate) -> Result<Bitmask> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match predicate {
                LeafPredicate::Nothing => Bitmask::empty(5),
                _ => Bitmask::from_docs(5, [1, 3]),
            })
        }
        fn doc_uid(&self, doc: DocId) -> Result<Option<String>> {
            Ok(Some(doc.to_string()))
        }
        fn doc_length(&self, _: &str, _: DocId) -> Result<u32> {
            Ok(0)
        }
        fn char_offsets(&self, _: &str, _: DocId) -> Result<Option<Vec<(u32, u32)>>> {
            Ok(None)
        }
        fn doc_counts(&self, _: &str, _: &str) -> Result<Vec<(DocId, u64)>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_bitmask_is_computed_once() {
        let cache = Arc::new(CollectionCache::new());
        let cb = CollectionBuilder::with_cache(Arc::clone(&cache));
        cb.to_cache_vc("odd", cb.term("UID", "x")).unwrap();
        let segment = CountingSegment {
            calls: AtomicUsize::new(0),
        };
        let first = cache.bits("odd", &segment).unwrap();
        let second = cache.bits("odd", &segment).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(segment.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached_len(), 1);

        cache.clear();
        assert_eq!(cache.cached_len(), 0);
        cache.bits("odd", &segment).unwrap();
        assert_eq!(segment.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_requests_share_one_computation() {
        let cache = Arc::new(CollectionCache::new());
        cache.define("odd", CollectionBuilder::new().term("UID", "x")).unwrap();
        let segment = CountingSegment {
            calls: AtomicUsize::new(0),
        };
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| cache.bits("odd", &segment).unwrap());
            }
        });
        assert_eq!(segment.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_redefinition_drops_bitmasks() {
        let cache = CollectionCache::new();
        let cb = CollectionBuilder::new();
        cache.define("v", cb.term("UID", "x")).unwrap();
        let segment = CountingSegment {
            calls: AtomicUsize::new(0),
        };
        assert_eq!(cache.bits("v", &segment).unwrap().len(), 2);
        cache.define("v", cb.nothing()).unwrap();
        assert!(cache.bits("v", &segment).unwrap().is_empty());
        assert!(cache.bits("missing", &segment).is_err());
    }

    #[test]
    fn test_indirect_cycles_are_rejected() {
        let cache = CollectionCache::new();
        let cb = CollectionBuilder::new();
        cache.define("a", cb.term("UID", "x")).unwrap();
        cache.define("b", Predicate::Cached("a".to_string())).unwrap();
        cache.define("c", Predicate::Cached("b".to_string())).unwrap();

        let err = cache.define("a", Predicate::Cached("c".to_string())).unwrap_err();
        assert_eq!(err.report().code, 830);
        assert!(err.to_string().contains("a -> c -> b -> a"));

        // the old definition of "a" is still in place and terminates
        let segment = CountingSegment {
            calls: AtomicUsize::new(0),
        };
        assert_eq!(cache.bits("c", &segment).unwrap().len(), 2);
    }
}
