//! Construction of collection predicates.
//!
//! Everything that can be rejected is rejected here, at build time: invalid
//! regular expressions, unparseable dates, empty groups and unknown named
//! collections. Evaluation against a segment only fails on storage errors.

use std::sync::Arc;

use crate::collection::cache::CollectionCache;
use crate::collection::date::{PartialDate, MAX_DATE};
use crate::error::{Result, SearchError};
use crate::storage::{LeafPredicate, SegmentStorage};
use crate::types::Bitmask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOp {
    And,
    Or,
}

/// Member of a group, optionally negated
#[derive(Debug, Clone, PartialEq)]
pub struct GroupChild {
    pub predicate: Predicate,
    pub negated: bool,
}

impl From<Predicate> for GroupChild {
    fn from(predicate: Predicate) -> Self {
        Self {
            predicate,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(LeafPredicate),
    Group {
        op: GroupOp,
        children: Vec<GroupChild>,
    },
    /// Reference to a named collection materialised through the cache
    Cached(String),
}

impl Predicate {
    /// Wrap as a negated group member
    pub fn negated(self) -> GroupChild {
        GroupChild {
            predicate: self,
            negated: true,
        }
    }

    /// Named collections this predicate refers to directly
    pub fn cached_names(&self) -> Vec<&str> {
        match self {
            Predicate::Leaf(_) => Vec::new(),
            Predicate::Cached(name) => vec![name.as_str()],
            Predicate::Group { children, .. } => children
                .iter()
                .flat_map(|c| c.predicate.cached_names())
                .collect(),
        }
    }

    /// Whether this predicate refers to the named collection `key` directly
    pub fn references(&self, key: &str) -> bool {
        self.cached_names().contains(&key)
    }

    /// Candidate documents of this predicate in `segment`, deleted documents included
    pub fn bits(&self, segment: &dyn SegmentStorage, cache: &CollectionCache) -> Result<Bitmask> {
        match self {
            Predicate::Leaf(leaf) => segment.doc_id_set(leaf),
            Predicate::Cached(key) => cache.bits(key, segment),
            Predicate::Group { op, children } => {
                let max_doc = segment.max_doc();
                let mut acc = match op {
                    GroupOp::And => Bitmask::full(max_doc),
                    GroupOp::Or => Bitmask::empty(max_doc),
                };
                for child in children {
                    let mut bits = child.predicate.bits(segment, cache)?;
                    if child.negated {
                        bits = bits.complement();
                    }
                    acc = match op {
                        GroupOp::And => acc.and(&bits),
                        GroupOp::Or => acc.or(&bits),
                    };
                }
                Ok(acc)
            }
        }
    }
}

/// Creates collection predicates, optionally against a cache of named collections
#[derive(Default)]
pub struct CollectionBuilder {
    cache: Option<Arc<CollectionCache>>,
}

impl CollectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: Arc<CollectionCache>) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn term(&self, field: &str, value: &str) -> Predicate {
        Predicate::Leaf(LeafPredicate::Term {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    pub fn re(&self, field: &str, pattern: &str) -> Result<Predicate> {
        regex::Regex::new(pattern).map_err(|e| {
            SearchError::malformed(format!("invalid regex '{}' for '{}': {}", pattern, field, e))
        })?;
        Ok(Predicate::Leaf(LeafPredicate::Regex {
            field: field.to_string(),
            pattern: pattern.to_string(),
        }))
    }

    /// Phrase of the whitespace-separated words of `text`
    pub fn text(&self, field: &str, text: &str) -> Result<Predicate> {
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            return Err(SearchError::malformed(format!("empty text predicate for '{}'", field)));
        }
        Ok(Predicate::Leaf(LeafPredicate::Text {
            field: field.to_string(),
            words,
        }))
    }

    pub fn since(&self, field: &str, date: &str) -> Result<Predicate> {
        let lower = PartialDate::parse(date)?.floor();
        Ok(self.range(field, lower, MAX_DATE))
    }

    pub fn till(&self, field: &str, date: &str) -> Result<Predicate> {
        let upper = PartialDate::parse(date)?.ceil();
        Ok(self.range(field, 0, upper))
    }

    pub fn between(&self, field: &str, from: &str, to: &str) -> Result<Predicate> {
        let lower = PartialDate::parse(from)?.floor();
        let upper = PartialDate::parse(to)?.ceil();
        if lower > upper {
            return Err(SearchError::malformed(format!(
                "date range '{}' to '{}' is empty",
                from, to
            )));
        }
        Ok(self.range(field, lower, upper))
    }

    /// Every day covered by a partial date
    pub fn date(&self, field: &str, date: &str) -> Result<Predicate> {
        let date = PartialDate::parse(date)?;
        Ok(self.range(field, date.floor(), date.ceil()))
    }

    /// Inclusive integer range
    pub fn range(&self, field: &str, lower: i64, upper: i64) -> Predicate {
        Predicate::Leaf(LeafPredicate::Range {
            field: field.to_string(),
            lower,
            upper,
        })
    }

    pub fn nothing(&self) -> Predicate {
        Predicate::Leaf(LeafPredicate::Nothing)
    }

    pub fn and_group(&self, children: Vec<GroupChild>) -> Result<Predicate> {
        Self::group(GroupOp::And, children)
    }

    pub fn or_group(&self, children: Vec<GroupChild>) -> Result<Predicate> {
        Self::group(GroupOp::Or, children)
    }

    fn group(op: GroupOp, mut children: Vec<GroupChild>) -> Result<Predicate> {
        if children.is_empty() {
            return Err(SearchError::malformed(format!("empty {:?} group", op)));
        }
        if children.len() == 1 && !children[0].negated {
            return Ok(children.remove(0).predicate);
        }
        Ok(Predicate::Group { op, children })
    }

    fn cache(&self) -> Result<&CollectionCache> {
        self.cache
            .as_deref()
            .ok_or_else(|| SearchError::malformed("named collections need a collection cache"))
    }

    /// Reference to a previously registered named collection
    pub fn named_vc(&self, key: &str) -> Result<Predicate> {
        if !self.cache()?.is_defined(key) {
            return Err(SearchError::malformed(format!("unknown named collection '{}'", key)));
        }
        Ok(Predicate::Cached(key.to_string()))
    }

    /// Register `predicate` as the named collection `key` and reference it.
    /// Definitions that would reach `key` again, directly or through other
    /// named collections, are rejected.
    pub fn to_cache_vc(&self, key: &str, predicate: Predicate) -> Result<Predicate> {
        self.cache()?.define(key, predicate)?;
        Ok(Predicate::Cached(key.to_string()))
    }
}
