//! Filtering and summarizing buffered records without re-tailing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::record::LogRecord;

/// Level or logger value that means "no filter".
const ALL: &str = "all";

/// Text a record's message or exception must contain.
#[derive(Debug, Clone)]
enum Search {
    /// Lowercased literal, matched case-insensitively.
    Literal(String),
    Pattern(Regex),
}

impl Search {
    fn is_match(&self, text: &str) -> bool {
        match self {
            Search::Literal(needle) => text.to_lowercase().contains(needle.as_str()),
            Search::Pattern(regex) => regex.is_match(text),
        }
    }
}

/// Criteria a record must meet to be shown.
///
/// Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    search: Option<Search>,
    level: Option<String>,
    logger: Option<String>,
}

impl RecordFilter {
    /// Create a filter that matches every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match records whose message or exception contains `term`, ignoring case.
    #[must_use]
    pub fn with_search(self, term: &str) -> Self {
        if term.trim().is_empty() {
            return Self {
                search: None,
                ..self
            };
        }
        Self {
            search: Some(Search::Literal(term.to_lowercase())),
            ..self
        }
    }

    /// Match records whose message or exception matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn with_pattern(self, pattern: &str) -> Result<Self, regex::Error> {
        let search = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            search: Some(Search::Pattern(search)),
            ..self
        })
    }

    /// Match records with this level label, ignoring case. `"all"` clears it.
    #[must_use]
    pub fn with_level(self, level: impl Into<String>) -> Self {
        Self {
            level: Some(level.into()).filter(|l| !l.eq_ignore_ascii_case(ALL)),
            ..self
        }
    }

    /// Match records from this logger (`sourceContext`). `"all"` clears it.
    #[must_use]
    pub fn with_logger(self, logger: impl Into<String>) -> Self {
        Self {
            logger: Some(logger.into()).filter(|l| !l.eq_ignore_ascii_case(ALL)),
            ..self
        }
    }

    /// Whether no criteria are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.level.is_none() && self.logger.is_none()
    }

    /// Check one record against every criterion.
    #[must_use]
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(level) = &self.level {
            if !record.level.eq_ignore_ascii_case(level) {
                return false;
            }
        }
        if let Some(logger) = &self.logger {
            if record.source_context.as_deref() != Some(logger.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let in_message = search.is_match(&record.message_template);
            let in_exception = record
                .exception
                .as_deref()
                .is_some_and(|e| search.is_match(e));
            if !in_message && !in_exception {
                return false;
            }
        }
        true
    }

    /// Keep the matching records, preserving order.
    #[must_use]
    pub fn apply(&self, records: &[Arc<LogRecord>]) -> Vec<Arc<LogRecord>> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

/// Record counts per level label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSummary {
    counts: BTreeMap<String, usize>,
    total: usize,
}

impl LevelSummary {
    /// Count the records of a snapshot by level.
    #[must_use]
    pub fn from_records(records: &[Arc<LogRecord>]) -> Self {
        let mut summary = Self::default();
        for record in records {
            *summary.counts.entry(record.level.clone()).or_default() += 1;
            summary.total += 1;
        }
        summary
    }

    /// Number of records with exactly this level label.
    #[must_use]
    pub fn count(&self, level: &str) -> usize {
        self.counts.get(level).copied().unwrap_or(0)
    }

    /// Every distinct level label, sorted.
    #[must_use]
    pub fn levels(&self) -> Vec<&str> {
        self.counts.keys().map(String::as_str).collect()
    }

    /// Iterate `(level, count)` pairs sorted by level.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(level, count)| (level.as_str(), *count))
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }
}

/// Every distinct logger name in a snapshot, sorted.
#[must_use]
pub fn unique_loggers(records: &[Arc<LogRecord>]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.source_context.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
