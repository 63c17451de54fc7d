//! Partial dates of the form `YYYY[-MM[-DD]]`, stored as `YYYYMMDD` integers.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, SearchError};

/// Upper bound used by `since` predicates
pub const MAX_DATE: i64 = 99_999_999;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?$").expect("date pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialDate {
    pub year: u32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl PartialDate {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let caps = DATE_PATTERN
            .captures(text)
            .ok_or_else(|| SearchError::malformed(format!("invalid date '{}'", text)))?;
        let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = part(1).ok_or_else(|| SearchError::malformed(format!("invalid date '{}'", text)))?;
        let month = part(2);
        let day = part(3);
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return Err(SearchError::malformed(format!("invalid month in date '{}'", text)));
            }
        }
        if let Some(d) = day {
            if !(1..=31).contains(&d) {
                return Err(SearchError::malformed(format!("invalid day in date '{}'", text)));
            }
        }
        Ok(Self { year, month, day })
    }

    /// Lowest `YYYYMMDD` value covered, missing parts as 0
    pub fn floor(&self) -> i64 {
        Self::compose(self.year, self.month.unwrap_or(0), self.day.unwrap_or(0))
    }

    /// Highest `YYYYMMDD` value covered, missing month 12 and day 31
    pub fn ceil(&self) -> i64 {
        Self::compose(self.year, self.month.unwrap_or(12), self.day.unwrap_or(31))
    }

    fn compose(year: u32, month: u32, day: u32) -> i64 {
        i64::from(year) * 10_000 + i64::from(month) * 100 + i64::from(day)
    }
}
