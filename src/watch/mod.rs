//! Watch lifecycle, per-watch record buffers and event fan-out.

mod buffer;
mod error;
mod manager;
mod outlet;
mod types;

pub use buffer::{BufferStore, SubscriberBuffer};
pub use error::WatchError;
pub use manager::WatchManager;
pub use types::{StopReason, WatchEvent, WatchInfo, WatchState};
