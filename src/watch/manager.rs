//! Watch manager: owns every active tail and fans out its events.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::buffer::{BufferStore, SubscriberBuffer};
use super::error::WatchError;
use super::outlet::Outlet;
use super::types::{StopReason, WatchEvent, WatchInfo, WatchState};
use crate::config::{DuplicatePolicy, TailConfig};
use crate::record::LogRecord;
use crate::tail::{LineReader, ReaderOptions, TailError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the manager and one watch's tail task.
struct WatchEntry {
    info: WatchInfo,
    cancel: CancellationToken,
    buffer: Arc<SubscriberBuffer>,
    /// Subscribers of this watch. Also serializes delivery against stop.
    outlet: Mutex<Outlet>,
    /// Subscribers of every watch.
    global: Arc<Mutex<Outlet>>,
    state: watch::Sender<WatchState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WatchEntry {
    /// Move from `Starting` to `Active` unless the watch was already stopped.
    fn activate(&self) -> Result<(), WatchError> {
        let _outlet = lock(&self.outlet);
        if self.cancel.is_cancelled() {
            return Err(WatchError::StoppedWhileStarting {
                path: self.info.file_path.clone(),
            });
        }
        self.state.send_replace(WatchState::Active);
        Ok(())
    }

    /// Normalize a line and deliver the result.
    ///
    /// Returns `false` once the watch has been cancelled; nothing is
    /// delivered after that point.
    fn deliver(&self, line: String) -> bool {
        let id = self.info.id.clone();
        let event = match LogRecord::parse(&line) {
            Ok(record) => WatchEvent::FileUpdate {
                id,
                line,
                record: Arc::new(record),
            },
            Err(e) => {
                tracing::debug!(id = %id, line = %line, error = %e, "Invalid log line");
                WatchEvent::InvalidLine {
                    id,
                    line,
                    reason: e.to_string(),
                }
            }
        };

        let mut outlet = lock(&self.outlet);
        if self.cancel.is_cancelled() {
            return false;
        }
        if let WatchEvent::FileUpdate { record, .. } = &event {
            self.buffer.append(Arc::clone(record));
        }
        outlet.publish(&event);
        lock(&self.global).publish(&event);
        true
    }
}

struct Inner {
    config: TailConfig,
    watches: Mutex<HashMap<String, Arc<WatchEntry>>>,
    buffers: BufferStore,
    global: Arc<Mutex<Outlet>>,
}

impl Inner {
    /// Reserve identity and buffer for a new watch in `Starting` state.
    fn register(&self, path: std::path::PathBuf) -> Result<Arc<WatchEntry>, WatchError> {
        let mut watches = lock(&self.watches);
        if self.config.duplicates == DuplicatePolicy::Reject
            && watches.values().any(|w| w.info.file_path == path)
        {
            return Err(WatchError::AlreadyWatching { path });
        }

        let info = WatchInfo::new(path);
        let buffer = self.buffers.create(&info.id);
        let (state, _) = watch::channel(WatchState::Starting);
        let entry = Arc::new(WatchEntry {
            info,
            cancel: CancellationToken::new(),
            buffer,
            outlet: Mutex::new(Outlet::default()),
            global: Arc::clone(&self.global),
            state,
            task: Mutex::new(None),
        });
        watches.insert(entry.info.id.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Drop a watch that never became active. No event is emitted.
    fn discard(&self, entry: &WatchEntry) {
        lock(&self.watches).remove(&entry.info.id);
        self.buffers.remove(&entry.info.id);
        entry.cancel.cancel();
        entry.state.send_replace(WatchState::Stopped);
    }

    /// Tear down a watch and announce it. No-op for unknown ids.
    fn retire(&self, id: &str, reason: StopReason) -> bool {
        let Some(entry) = lock(&self.watches).remove(id) else {
            return false;
        };
        self.buffers.remove(id);

        let event = WatchEvent::TailStopped {
            id: id.to_string(),
            path: entry.info.file_path.clone(),
            reason,
        };

        let mut outlet = lock(&entry.outlet);
        entry.cancel.cancel();
        entry.state.send_replace(WatchState::Stopped);
        outlet.publish(&event);
        lock(&self.global).publish(&event);
        outlet.close();

        tracing::info!(
            id = %id,
            path = %entry.info.file_path.display(),
            "Stopped tailing"
        );
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let watches = self.watches.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in watches.values() {
            entry.cancel.cancel();
        }
    }
}

/// Owns the set of active watches.
///
/// Cloning yields another handle to the same set. Each watch runs its own
/// tail task; all tasks are cancelled when the last handle is dropped.
#[derive(Clone)]
pub struct WatchManager {
    inner: Arc<Inner>,
}

impl WatchManager {
    /// Create a manager with the given tailing configuration.
    #[must_use]
    pub fn new(config: TailConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                watches: Mutex::new(HashMap::new()),
                buffers: BufferStore::new(),
                global: Arc::new(Mutex::new(Outlet::default())),
            }),
        }
    }

    /// Start tailing `path`.
    ///
    /// The path is canonicalized; only content appended after this call is
    /// reported. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Tail` if the file cannot be opened,
    /// `WatchError::AlreadyWatching` if the path is already tailed and
    /// duplicates are rejected, or `WatchError::StoppedWhileStarting` if the
    /// watch was stopped before its reader was running.
    pub async fn start_watch(&self, path: impl AsRef<Path>) -> Result<WatchInfo, WatchError> {
        let requested = path.as_ref();
        let path = tokio::fs::canonicalize(requested)
            .await
            .map_err(|source| TailError::Open {
                path: requested.to_path_buf(),
                source,
            })?;

        let entry = self.inner.register(path)?;
        let options = ReaderOptions::from(&self.inner.config);
        let reader = match LineReader::open(&entry.info.file_path, options).await {
            Ok(reader) => reader,
            Err(e) => {
                self.inner.discard(&entry);
                return Err(e.into());
            }
        };

        entry.activate()?;

        let handle = tokio::spawn(run_tail(
            Arc::downgrade(&self.inner),
            Arc::clone(&entry),
            reader,
        ));
        *lock(&entry.task) = Some(handle);

        tracing::info!(
            id = %entry.info.id,
            path = %entry.info.file_path.display(),
            "Started tailing"
        );
        Ok(entry.info.clone())
    }

    /// Stop the watch with `id`.
    ///
    /// Emits `TailStopped` and discards the watch's buffer. Returns `false`
    /// if no such watch is live; that is not an error.
    pub fn stop_watch(&self, id: &str) -> bool {
        self.inner.retire(id, StopReason::Requested)
    }

    /// Stop every watch and wait for their tasks to exit.
    pub async fn shutdown(&self) {
        let entries: Vec<Arc<WatchEntry>> = lock(&self.inner.watches).values().cloned().collect();
        for entry in &entries {
            self.inner.retire(&entry.info.id, StopReason::Requested);
        }
        for entry in entries {
            let handle = lock(&entry.task).take();
            if let Some(handle) = handle {
                if let Err(e) = handle.await {
                    tracing::warn!(id = %entry.info.id, error = %e, "Tail task failed");
                }
            }
        }
    }

    /// Receive the events of one watch.
    ///
    /// The receiver ends after the watch's `TailStopped` event. Returns
    /// `None` if the watch is not live.
    #[must_use]
    pub fn subscribe(&self, id: &str) -> Option<mpsc::UnboundedReceiver<WatchEvent>> {
        let entry = lock(&self.inner.watches).get(id).cloned()?;
        let mut outlet = lock(&entry.outlet);
        if entry.cancel.is_cancelled() {
            return None;
        }
        Some(outlet.subscribe())
    }

    /// Receive the events of every watch, current and future.
    #[must_use]
    pub fn events(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        lock(&self.inner.global).subscribe()
    }

    /// Records received so far by a live watch, in file order.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Vec<Arc<LogRecord>>> {
        self.inner.buffers.snapshot(id)
    }

    /// Current state of a live watch. `None` once it has been removed.
    #[must_use]
    pub fn state(&self, id: &str) -> Option<WatchState> {
        let entry = lock(&self.inner.watches).get(id).cloned()?;
        let state = *entry.state.borrow();
        Some(state)
    }

    /// Follow the state of a live watch, including its final `Stopped`.
    #[must_use]
    pub fn state_updates(&self, id: &str) -> Option<watch::Receiver<WatchState>> {
        lock(&self.inner.watches)
            .get(id)
            .map(|entry| entry.state.subscribe())
    }

    /// Get identity of a live watch.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<WatchInfo> {
        lock(&self.inner.watches)
            .get(id)
            .map(|entry| entry.info.clone())
    }

    /// All live watches, oldest first.
    #[must_use]
    pub fn watches(&self) -> Vec<WatchInfo> {
        let mut infos: Vec<WatchInfo> = lock(&self.inner.watches)
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        infos.sort_by_key(|info| info.started_at);
        infos
    }

    /// Get the number of live watches.
    #[must_use]
    pub fn active_count(&self) -> usize {
        lock(&self.inner.watches).len()
    }
}

impl Default for WatchManager {
    fn default() -> Self {
        Self::new(TailConfig::default())
    }
}

impl std::fmt::Debug for WatchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchManager")
            .field("config", &self.inner.config)
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

/// Tail loop for one watch.
async fn run_tail(inner: Weak<Inner>, entry: Arc<WatchEntry>, mut reader: LineReader) {
    loop {
        let next = tokio::select! {
            biased;
            () = entry.cancel.cancelled() => break,
            next = reader.next_line() => next,
        };

        match next {
            Ok(line) => {
                if !entry.deliver(line) {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(
                    id = %entry.info.id,
                    path = %entry.info.file_path.display(),
                    offset = reader.offset(),
                    error = %e,
                    "Tail failed, stopping watch"
                );
                if let Some(inner) = inner.upgrade() {
                    inner.retire(&entry.info.id, StopReason::ReadError(e.to_string()));
                }
                break;
            }
        }
    }

    tracing::debug!(id = %entry.info.id, "Tail task exited");
}
