//! Incremental tailing of a single growing log file.

mod error;
mod reader;
mod signal;

pub use error::TailError;
pub use reader::{LineReader, ReaderOptions, StartFrom};
pub use signal::ChangeSignal;
