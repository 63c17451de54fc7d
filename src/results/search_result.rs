use serde::{Deserialize, Serialize};

use crate::error::ErrorReport;
use crate::types::{DocId, PayloadEntry};

/// A single hit of a span query, with its context window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// External document identifier
    pub uid: String,
    pub segment_ord: u32,
    pub local_doc: DocId,
    pub start: u32,
    pub end: u32,
    pub payload: Vec<PayloadEntry>,
    pub context_start: u32,
    pub context_end: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_end: Option<u32>,
    /// The match was cut to the maximum match size
    #[serde(default)]
    pub truncated: bool,
}

impl Match {
    pub fn match_id(&self) -> String {
        format!("match-{}-p{}-{}", self.uid, self.start, self.end)
    }

    /// Class marks of the payload as `(class, start, end)`
    pub fn classes(&self) -> Vec<(u8, u32, u32)> {
        self.payload.iter().filter_map(PayloadEntry::as_class).collect()
    }

    pub fn width(&self) -> u32 {
        self.end - self.start
    }
}

/// One page of matches plus totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matches over all segments; a lower bound when `cutoff` is set
    pub total_results: u64,
    pub start_index: usize,
    pub items_per_page: usize,
    /// Counting stopped after the requested page
    pub cutoff: bool,
    pub timed_out: bool,
    /// Segments left out after a storage failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_segments: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ErrorReport>,
    pub matches: Vec<Match>,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
