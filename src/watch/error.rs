//! Watch manager error types.

use std::path::PathBuf;

use crate::tail::TailError;

/// Errors returned when starting a watch.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    /// The path is already tailed and duplicates are rejected.
    #[error("Already watching {path}")]
    AlreadyWatching { path: PathBuf },

    /// The watch was stopped while it was still starting.
    #[error("Watch on {path} was stopped before it started")]
    StoppedWhileStarting { path: PathBuf },

    /// The file could not be opened for tailing.
    #[error(transparent)]
    Tail(#[from] TailError),
}
