//! Event Horizon - tail structured log files and normalize every line into
//! one canonical record.

pub mod config;
pub mod display;
pub mod filter;
pub mod record;
pub mod tail;
pub mod watch;

pub use record::LogRecord;
pub use watch::{WatchEvent, WatchInfo, WatchManager};
