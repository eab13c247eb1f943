//! Per-watch, append-only record history.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::record::LogRecord;

/// Ordered history of one watch's records.
///
/// Written only by the watch's own tail task; any number of readers may take
/// snapshots concurrently.
#[derive(Debug, Default)]
pub struct SubscriberBuffer {
    records: RwLock<Vec<Arc<LogRecord>>>,
}

impl SubscriberBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record after every record already present.
    pub fn append(&self, record: Arc<LogRecord>) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Copy of the current contents in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<LogRecord>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Buffers for every live watch, keyed by watch id.
#[derive(Debug, Default)]
pub struct BufferStore {
    buffers: RwLock<HashMap<String, Arc<SubscriberBuffer>>>,
}

impl BufferStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) the buffer for `id` and return it.
    pub fn create(&self, id: &str) -> Arc<SubscriberBuffer> {
        let buffer = Arc::new(SubscriberBuffer::new());
        self.buffers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), Arc::clone(&buffer));
        buffer
    }

    fn get(&self, id: &str) -> Option<Arc<SubscriberBuffer>> {
        self.buffers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Snapshot the buffer for `id`.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Vec<Arc<LogRecord>>> {
        self.get(id).map(|buffer| buffer.snapshot())
    }

    /// Discard the whole buffer for `id`.
    pub fn remove(&self, id: &str) -> bool {
        self.buffers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }
}
