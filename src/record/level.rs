//! Severity categories for free-text level labels.

/// Coarse severity bucket for a level label.
///
/// Only used for presentation; a record's `level` string is never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LevelCategory {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
    /// Unknown labels, including the `-` placeholder.
    Other,
}

impl LevelCategory {
    /// Bucket a level label, ignoring case.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "VERBOSE" | "VRB" | "TRC" => LevelCategory::Trace,
            "DEBUG" | "DBG" => LevelCategory::Debug,
            "INFORMATION" | "INFO" | "INF" => LevelCategory::Information,
            "WARNING" | "WARN" | "WRN" => LevelCategory::Warning,
            "ERROR" | "ERR" | "EROR" => LevelCategory::Error,
            "FATAL" | "CRITICAL" | "FTL" | "CRIT" => LevelCategory::Fatal,
            _ => LevelCategory::Other,
        }
    }

    /// Whether the label denotes a failure.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, LevelCategory::Error | LevelCategory::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_labels() {
        assert_eq!(LevelCategory::from_label("ERROR"), LevelCategory::Error);
        assert_eq!(LevelCategory::from_label("error"), LevelCategory::Error);
        assert_eq!(
            LevelCategory::from_label("Information"),
            LevelCategory::Information
        );
        assert_eq!(LevelCategory::from_label("info"), LevelCategory::Information);
    }

    #[test]
    fn test_short_and_alias_labels() {
        assert_eq!(LevelCategory::from_label("WARN"), LevelCategory::Warning);
        assert_eq!(LevelCategory::from_label("Verbose"), LevelCategory::Trace);
        assert_eq!(LevelCategory::from_label("critical"), LevelCategory::Fatal);
        assert_eq!(LevelCategory::from_label("dbg"), LevelCategory::Debug);
    }

    #[test]
    fn test_unknown_labels() {
        assert_eq!(LevelCategory::from_label("-"), LevelCategory::Other);
        assert_eq!(LevelCategory::from_label(""), LevelCategory::Other);
        assert_eq!(LevelCategory::from_label("NOTICE"), LevelCategory::Other);
    }

    #[test]
    fn test_is_failure() {
        assert!(LevelCategory::Error.is_failure());
        assert!(LevelCategory::Fatal.is_failure());
        assert!(!LevelCategory::Warning.is_failure());
    }
}
