//! Watch identity, lifecycle state and emitted events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::record::LogRecord;

/// Identity and description of one active tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchInfo {
    /// Process-unique id, never reused.
    pub id: String,
    /// Absolute path of the tailed file.
    pub file_path: PathBuf,
    /// Display name derived from the path.
    pub file_name: String,
    pub started_at: DateTime<Utc>,
}

impl WatchInfo {
    /// Create identity for a new watch on `file_path`.
    #[must_use]
    pub fn new(file_path: PathBuf) -> Self {
        let file_name = display_name(&file_path);
        Self {
            id: Uuid::new_v4().to_string(),
            file_path,
            file_name,
            started_at: Utc::now(),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Lifecycle of a watch. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Starting,
    Active,
    Stopped,
}

/// Why a watch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "kebab-case")]
pub enum StopReason {
    /// Stopped on request.
    Requested,
    /// Reading the file failed; the watch cannot continue.
    ReadError(String),
}

/// Event emitted by the watch manager.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum WatchEvent {
    /// A line was read and normalized.
    FileUpdate {
        id: String,
        line: String,
        record: Arc<LogRecord>,
    },
    /// A line was read but produced no record.
    ///
    /// Non-fatal; tailing continues with the next line.
    InvalidLine {
        id: String,
        line: String,
        reason: String,
    },
    /// The watch ended and will emit nothing further.
    TailStopped {
        id: String,
        path: PathBuf,
        reason: StopReason,
    },
}

impl WatchEvent {
    /// Id of the watch the event belongs to.
    #[must_use]
    pub fn watch_id(&self) -> &str {
        match self {
            WatchEvent::FileUpdate { id, .. }
            | WatchEvent::InvalidLine { id, .. }
            | WatchEvent::TailStopped { id, .. } => id,
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            WatchEvent::FileUpdate { .. } => "file-update",
            WatchEvent::InvalidLine { .. } => "invalid-line",
            WatchEvent::TailStopped { .. } => "tail-stopped",
        }
    }
}
