//! Colored terminal output for tailed records and watch events.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;
use serde_json::{Map, Value};

use crate::config::DisplayConfig;
use crate::filter::LevelSummary;
use crate::record::{property_text, LevelCategory, LogRecord};
use crate::watch::{StopReason, WatchInfo};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to a maximum number of characters, adding ellipsis if
/// truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Render properties as `key=value` pairs.
#[must_use]
pub fn format_properties(properties: &Map<String, Value>, raw_mode: bool) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{k}={}", truncate(&property_text(v), 50, raw_mode)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Level label colored by its severity.
#[must_use]
pub fn level_badge(level: &str) -> String {
    let label = format!("[{level}]");
    match LevelCategory::from_label(level) {
        LevelCategory::Fatal => label.on_red().bold().to_string(),
        LevelCategory::Error => label.red().bold().to_string(),
        LevelCategory::Warning => label.yellow().bold().to_string(),
        LevelCategory::Information => label.blue().bold().to_string(),
        LevelCategory::Debug => label.green().to_string(),
        LevelCategory::Trace => label.purple().to_string(),
        LevelCategory::Other => label.dimmed().to_string(),
    }
}

/// Print the start of a watch.
pub fn print_watch_started(info: &WatchInfo) {
    println!(
        "{} {} {} id={}",
        timestamp().dimmed(),
        "[WATCH]".cyan().bold(),
        info.file_path.display(),
        info.id.dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print one normalized record.
pub fn print_record(file_name: &str, record: &LogRecord, config: &DisplayConfig) {
    let message = truncate(&record.message_template, config.max_message_len, config.raw);
    let logger = record
        .source_context
        .as_deref()
        .map_or(String::new(), |s| format!(" {}", s.cyan()));

    println!(
        "{} {} {}{} {}",
        record.timestamp.dimmed(),
        file_name.bold(),
        level_badge(&record.level),
        logger,
        message
    );

    if let Some(exception) = &record.exception {
        println!("    {}", exception.red());
    }
    if config.show_properties && !record.properties.is_empty() {
        println!(
            "    {}",
            format_properties(&record.properties, config.raw).dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print a line that could not be normalized.
pub fn print_invalid_line(file_name: &str, line: &str, reason: &str, raw_mode: bool) {
    println!(
        "{} {} {} {} ({})",
        timestamp().dimmed(),
        file_name.bold(),
        "[SKIPPED]".yellow().bold(),
        truncate(line, 80, raw_mode).dimmed(),
        reason
    );
    let _ = io::stdout().flush();
}

/// Print the end of a watch.
pub fn print_tail_stopped(path: &Path, reason: &StopReason) {
    match reason {
        StopReason::Requested => println!(
            "{} {} {}",
            timestamp().dimmed(),
            "[STOPPED]".cyan().bold(),
            path.display()
        ),
        StopReason::ReadError(message) => println!(
            "{} {} {} - {}",
            timestamp().dimmed(),
            "[STOPPED]".red().bold(),
            path.display(),
            message.red()
        ),
    }
    let _ = io::stdout().flush();
}

/// Print per-level counts for a file.
pub fn print_summary(file_name: &str, summary: &LevelSummary, loggers: &[String]) {
    println!("{} {} records", file_name.bold(), summary.total());
    for (level, count) in summary.iter() {
        if LevelCategory::from_label(level).is_failure() {
            println!("  {} {}", level_badge(level), count.red().bold());
        } else {
            println!("  {} {count}", level_badge(level));
        }
    }
    if !loggers.is_empty() {
        println!("  {} {}", "loggers:".dimmed(), loggers.join(", "));
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
