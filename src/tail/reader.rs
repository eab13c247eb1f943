//! Incremental line reader for a growing file.
//!
//! Holds the file open, remembers the byte offset it has consumed, and turns
//! appended bytes into complete lines.

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::TailError;
use super::signal::ChangeSignal;
use crate::config::TailConfig;

/// Most bytes consumed by one `read_available` call.
const READ_CHUNK_BYTES: u64 = 1024 * 1024;

/// Where a new reader starts consuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartFrom {
    /// Skip existing content; only appended lines are read.
    #[default]
    End,
    /// Read the whole file first.
    Beginning,
}

/// Reader tuning.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub start: StartFrom,
    /// Upper bound on the wait between checks for new data.
    pub poll_interval: Duration,
    /// A partial line longer than this is emitted without a terminator.
    pub max_line_bytes: usize,
    /// Use file-system notifications to wake before the poll interval ends.
    pub use_notify: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::from(&TailConfig::default())
    }
}

impl From<&TailConfig> for ReaderOptions {
    fn from(config: &TailConfig) -> Self {
        Self {
            start: StartFrom::End,
            poll_interval: config.poll_interval(),
            max_line_bytes: config.max_line_bytes,
            use_notify: config.use_notify,
        }
    }
}

/// Incremental reader that yields newly appended lines of one file.
///
/// Partial trailing lines are buffered until their terminator arrives. If
/// the file shrinks below the consumed offset, or (on Unix) the path now
/// names a different file, reading restarts from the beginning.
#[derive(Debug)]
pub struct LineReader {
    path: PathBuf,
    file: File,
    /// Bytes consumed from the current file.
    offset: u64,
    /// Bytes of an unterminated line.
    pending: Vec<u8>,
    /// Complete lines not yet handed out by `next_line`.
    ready: VecDeque<String>,
    options: ReaderOptions,
    signal: Option<ChangeSignal>,
}

impl LineReader {
    /// Open `path` for tailing.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Open` if the file cannot be opened, is not a
    /// regular file, or the initial seek fails.
    pub async fn open(path: impl Into<PathBuf>, options: ReaderOptions) -> Result<Self, TailError> {
        let path = path.into();
        let open_err = |source| TailError::Open {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).await.map_err(open_err)?;
        let metadata = file.metadata().await.map_err(open_err)?;
        if !metadata.is_file() {
            return Err(open_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let offset = match options.start {
            StartFrom::End => file.seek(SeekFrom::End(0)).await.map_err(open_err)?,
            StartFrom::Beginning => 0,
        };

        let signal = if options.use_notify {
            match ChangeSignal::new(&path) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "File notifications unavailable, falling back to polling"
                    );
                    None
                }
            }
        } else {
            None
        };

        tracing::debug!(path = %path.display(), offset, "Opened file for tailing");

        Ok(Self {
            path,
            file,
            offset,
            pending: Vec::new(),
            ready: VecDeque::new(),
            options,
            signal,
        })
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read every complete line appended since the last read.
    ///
    /// Returns an empty vector when nothing new is available. Blank lines are
    /// dropped. At most `READ_CHUNK_BYTES` are consumed per call; the rest is
    /// left for the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file was deleted, became unreadable, or an
    /// I/O error occurred while reading.
    pub async fn read_available(&mut self) -> Result<Vec<String>, TailError> {
        let current = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| TailError::from_read(&self.path, e))?;

        if current.len() < self.offset || self.was_replaced(&current).await? {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = current.len(),
                "File truncated or replaced, reading from the start"
            );
            self.reopen().await?;
        }

        if current.len() <= self.offset {
            return Ok(Vec::new());
        }

        let mut chunk = Vec::new();
        self.file
            .seek(SeekFrom::Start(self.offset))
            .await
            .map_err(|e| TailError::from_read(&self.path, e))?;
        (&mut self.file)
            .take(READ_CHUNK_BYTES)
            .read_to_end(&mut chunk)
            .await
            .map_err(|e| TailError::from_read(&self.path, e))?;
        self.offset += chunk.len() as u64;

        Ok(self.split_lines(&chunk))
    }

    /// Wait for and return the next complete line.
    ///
    /// Not cancel-safe: dropping the future mid-read may lose buffered data,
    /// so the reader should be discarded afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first error hit by [`LineReader::read_available`].
    pub async fn next_line(&mut self) -> Result<String, TailError> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(line);
            }

            let offset = self.offset;
            let lines = self.read_available().await?;
            if lines.is_empty() {
                if self.offset == offset {
                    self.wait_for_change().await;
                }
            } else {
                self.ready.extend(lines);
            }
        }
    }

    /// Turn the reader into a stream of lines.
    ///
    /// The stream ends after yielding the first error.
    pub fn into_stream(self) -> impl futures_core::Stream<Item = Result<String, TailError>> {
        futures_util::stream::unfold(Some(self), |reader| async move {
            let mut reader = reader?;
            match reader.next_line().await {
                Ok(line) => Some((Ok(line), Some(reader))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    async fn wait_for_change(&self) {
        match &self.signal {
            Some(signal) => {
                let _ = tokio::time::timeout(self.options.poll_interval, signal.changed()).await;
            }
            None => tokio::time::sleep(self.options.poll_interval).await,
        }
    }

    async fn reopen(&mut self) -> Result<(), TailError> {
        self.file = File::open(&self.path)
            .await
            .map_err(|e| TailError::from_read(&self.path, e))?;
        self.offset = 0;
        self.pending.clear();
        Ok(())
    }

    #[cfg(unix)]
    async fn was_replaced(&self, current: &std::fs::Metadata) -> Result<bool, TailError> {
        use std::os::unix::fs::MetadataExt;

        let open = self
            .file
            .metadata()
            .await
            .map_err(|e| TailError::from_read(&self.path, e))?;
        Ok(open.dev() != current.dev() || open.ino() != current.ino())
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_async)]
    async fn was_replaced(&self, _current: &std::fs::Metadata) -> Result<bool, TailError> {
        Ok(false)
    }

    fn split_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        // Bytes already pending hold no terminator.
        let mut search_from = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut line_start = 0;
        while let Some(pos) = self.pending[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + pos;
            push_line(&mut lines, &self.pending[line_start..end]);
            line_start = end + 1;
            search_from = line_start;
        }
        self.pending.drain(..line_start);

        if self.pending.len() > self.options.max_line_bytes {
            tracing::warn!(
                path = %self.path.display(),
                len = self.pending.len(),
                limit = self.options.max_line_bytes,
                "Unterminated line exceeds limit, emitting as is"
            );
            let raw = std::mem::take(&mut self.pending);
            push_line(&mut lines, &raw);
        }

        lines
    }
}

fn push_line(lines: &mut Vec<String>, raw: &[u8]) {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = String::from_utf8_lossy(raw);
    if !text.trim().is_empty() {
        lines.push(text.into_owned());
    }
}
