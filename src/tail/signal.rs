//! File-system change notifications for a tailed file.
//!
//! Bridges notify-debouncer-full callbacks to a tokio [`Notify`] so the
//! reader can wake early instead of waiting out its poll interval.

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use tokio::sync::Notify;

use super::error::TailError;

/// Debounce window for file-system events.
const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(50);

/// Wakes a waiting reader when its file changes on disk.
pub struct ChangeSignal {
    notify: Arc<Notify>,
    /// Kept alive for as long as the signal exists.
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl ChangeSignal {
    /// Start watching the directory that contains `path`.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// replacement of the file is still observed.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Notify` if the platform watcher cannot be created.
    pub fn new(path: &Path) -> Result<Self, TailError> {
        let notify = Arc::new(Notify::new());
        let target: Option<OsString> = path.file_name().map(ToOwned::to_owned);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let wake = Arc::clone(&notify);
        let mut debouncer = new_debouncer(
            DEBOUNCE_TIMEOUT,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let touched = events
                        .iter()
                        .any(|event| event.paths.iter().any(|p| p.file_name() == target.as_deref()));
                    if touched {
                        wake.notify_one();
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!(error = %error, "File watcher error");
                    }
                }
            },
        )?;

        debouncer.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            notify,
            _debouncer: debouncer,
        })
    }

    /// Wait until the file is reported as changed.
    ///
    /// A change reported while nobody was waiting is remembered, so the next
    /// call returns immediately.
    pub async fn changed(&self) {
        self.notify.notified().await;
    }
}

impl std::fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSignal").finish_non_exhaustive()
    }
}
