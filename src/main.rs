//! Event Horizon - tail structured log files from the terminal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use event_horizon::config::{Config, ConfigLoader, DisplayConfig};
use event_horizon::display;
use event_horizon::filter::{unique_loggers, LevelSummary, RecordFilter};
use event_horizon::record::parse_log_content;
use event_horizon::{WatchEvent, WatchManager};

#[derive(Parser)]
#[command(
    name = "event-horizon",
    about = "Tail structured JSON log files and normalize every line",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow one or more files and print new records as they are appended.
    Tail {
        /// Files to tail.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Normalize an existing file once and print its records and level counts.
    Show {
        /// File to read.
        file: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Only show records with this level.
    #[arg(long)]
    level: Option<String>,
    /// Only show records from this logger (source context).
    #[arg(long)]
    logger: Option<String>,
    /// Only show records whose message contains this text.
    #[arg(short, long)]
    search: Option<String>,
    /// Treat --search as a regular expression.
    #[arg(long, requires = "search")]
    regex: bool,
}

impl FilterArgs {
    fn build(&self) -> Result<RecordFilter, regex::Error> {
        let mut filter = RecordFilter::new();
        if let Some(level) = &self.level {
            filter = filter.with_level(level.as_str());
        }
        if let Some(logger) = &self.logger {
            filter = filter.with_logger(logger.as_str());
        }
        if let Some(search) = &self.search {
            filter = if self.regex {
                filter.with_pattern(search)?
            } else {
                filter.with_search(search)
            };
        }
        Ok(filter)
    }
}

#[derive(Args, Debug, Default)]
struct OutputArgs {
    /// Print each record's properties.
    #[arg(short, long)]
    properties: bool,
    /// Do not truncate long messages.
    #[arg(long)]
    raw: bool,
}

impl OutputArgs {
    fn apply(&self, display: &mut DisplayConfig) {
        display.show_properties |= self.properties;
        display.raw |= self.raw;
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Option<Config> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            display::print_error(&e.to_string());
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(mut config) = load_config(cli.config) else {
        return ExitCode::FAILURE;
    };

    match cli.command {
        Commands::Tail {
            files,
            filter,
            output,
        } => {
            output.apply(&mut config.display);
            match filter.build() {
                Ok(filter) => tail_files(config, files, filter).await,
                Err(e) => {
                    display::print_error(&format!("Invalid search pattern: {e}"));
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Show {
            file,
            filter,
            output,
        } => {
            output.apply(&mut config.display);
            match filter.build() {
                Ok(filter) => show_file(&config, &file, &filter).await,
                Err(e) => {
                    display::print_error(&format!("Invalid search pattern: {e}"));
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn tail_files(config: Config, files: Vec<PathBuf>, filter: RecordFilter) -> ExitCode {
    let manager = WatchManager::new(config.tail.clone());
    let mut events = UnboundedReceiverStream::new(manager.events());
    let mut names: HashMap<String, String> = HashMap::new();

    for path in &files {
        match manager.start_watch(path).await {
            Ok(info) => {
                display::print_watch_started(&info);
                names.insert(info.id.clone(), info.file_name.clone());
            }
            Err(e) => display::print_error(&format!("{}: {e}", path.display())),
        }
    }

    if manager.active_count() == 0 {
        return ExitCode::FAILURE;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping all watches");
                break;
            }
            event = events.next() => {
                let Some(event) = event else { break };
                print_event(&event, &names, &filter, &config.display);
                if matches!(event, WatchEvent::TailStopped { .. }) && manager.active_count() == 0 {
                    break;
                }
            }
        }
    }

    manager.shutdown().await;
    let mut events = events.into_inner();
    while let Ok(event) = events.try_recv() {
        print_event(&event, &names, &filter, &config.display);
    }

    ExitCode::SUCCESS
}

fn print_event(
    event: &WatchEvent,
    names: &HashMap<String, String>,
    filter: &RecordFilter,
    config: &DisplayConfig,
) {
    let name = names
        .get(event.watch_id())
        .map_or(event.watch_id(), String::as_str);

    match event {
        WatchEvent::FileUpdate { record, .. } => {
            if filter.matches(record) {
                display::print_record(name, record, config);
            }
        }
        WatchEvent::InvalidLine { line, reason, .. } => {
            display::print_invalid_line(name, line, reason, config.raw);
        }
        WatchEvent::TailStopped { path, reason, .. } => {
            display::print_tail_stopped(path, reason);
        }
    }
}

async fn show_file(config: &Config, file: &Path, filter: &RecordFilter) -> ExitCode {
    let content = match tokio::fs::read(file).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            display::print_error(&format!("{}: {e}", file.display()));
            return ExitCode::FAILURE;
        }
    };

    let records: Vec<Arc<_>> = parse_log_content(&content)
        .into_iter()
        .map(Arc::new)
        .collect();
    let name = file_name(file);

    for record in filter.apply(&records) {
        display::print_record(&name, &record, &config.display);
    }

    let summary = LevelSummary::from_records(&records);
    display::print_summary(&name, &summary, &unique_loggers(&records));
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tail_with_filters() {
        let cli = Cli::try_parse_from([
            "event-horizon",
            "tail",
            "a.log",
            "b.log",
            "--level",
            "Error",
            "--search",
            "timeout",
            "-p",
        ])
        .unwrap();
        let Commands::Tail {
            files,
            filter,
            output,
        } = cli.command
        else {
            panic!("expected tail command");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(filter.level.as_deref(), Some("Error"));
        assert!(output.properties);
        assert!(!filter.build().unwrap().is_empty());
    }

    #[test]
    fn test_tail_requires_a_file() {
        assert!(Cli::try_parse_from(["event-horizon", "tail"]).is_err());
    }

    #[test]
    fn test_regex_requires_search() {
        assert!(Cli::try_parse_from(["event-horizon", "show", "a.log", "--regex"]).is_err());
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let args = FilterArgs {
            search: Some("(".to_string()),
            regex: true,
            ..Default::default()
        };
        assert!(args.build().is_err());
    }

    #[test]
    fn test_output_args_override_config() {
        let mut display = DisplayConfig::default();
        OutputArgs {
            properties: true,
            raw: true,
        }
        .apply(&mut display);
        assert!(display.show_properties);
        assert!(display.raw);
    }
}
