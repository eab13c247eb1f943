//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do when a path that is already tailed is requested again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse with `WatchError::AlreadyWatching`.
    #[default]
    Reject,
    /// Start another independent watch with its own id and buffer.
    Allow,
}

/// Tailing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TailConfig {
    /// Longest wait between checks for appended data, in milliseconds.
    pub poll_interval_ms: u64,
    /// Wake on file-system notifications instead of waiting out the poll.
    pub use_notify: bool,
    /// Unterminated lines longer than this are emitted as they are.
    pub max_line_bytes: usize,
    pub duplicates: DuplicatePolicy,
}

impl TailConfig {
    /// Poll interval as a `Duration`, never zero.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            use_notify: true,
            max_line_bytes: 1024 * 1024,
            duplicates: DuplicatePolicy::Reject,
        }
    }
}

/// Terminal output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Print messages without truncation.
    pub raw: bool,
    /// Print each record's properties below it.
    pub show_properties: bool,
    pub max_message_len: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            raw: false,
            show_properties: false,
            max_message_len: 200,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub tail: TailConfig,
    pub display: DisplayConfig,
}
