//! Log line classification and normalization.
//!
//! Turns one raw JSON log line into a format-independent [`LogRecord`].

mod error;
mod level;
mod normalize;
mod schema;

pub use error::NormalizeError;
pub use level::LevelCategory;
pub use normalize::{normalize, parse_log_content, property_text, LogRecord};
pub use schema::{classify, ClassifiedLine, CompactLine, DefaultLine, SchemaKind};
