//! Line reader error types.

use std::path::PathBuf;

/// Errors that can occur while tailing a file.
#[derive(thiserror::Error, Debug)]
pub enum TailError {
    /// The file could not be opened when the tail started.
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tailed file was deleted.
    #[error("Tailed file deleted: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// I/O failure while reading appended data.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}

impl TailError {
    /// Classify an I/O error hit while reading an already-open tail.
    pub(crate) fn from_read(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => TailError::FileDeleted(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                TailError::PermissionDenied(path.to_path_buf())
            }
            _ => TailError::Read {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}
