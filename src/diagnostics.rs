//! Diagnostic logging of rewrite decisions.
//!
//! This is the user-facing debug channel, separate from the crate's
//! `tracing` telemetry: entries land in a sink the host application owns
//! (typically a log file it can display and clear). Sink failures are
//! swallowed; logging must never break an in-flight rewrite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Category of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Free-form decision notes
    String,
    /// Outgoing request snapshots
    Request,
    /// Response snapshots
    Response,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogCategory::String => write!(f, "STRING"),
            LogCategory::Request => write!(f, "REQUEST"),
            LogCategory::Response => write!(f, "RESPONSE"),
        }
    }
}

/// One diagnostic entry. Append-only; removed only by an explicit
/// [`LogSink::clear`].
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Entry category
    pub category: LogCategory,
    /// Message text
    pub payload: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(category: LogCategory, payload: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            payload: payload.into(),
        }
    }

    /// Render as a single log line: `[2024-01-01 00:00:00] [STRING]: message`.
    pub fn format_line(&self) -> String {
        format!(
            "[{}] [{}]: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.category,
            self.payload
        )
    }
}

/// Destination for diagnostic entries.
pub trait LogSink: Send + Sync {
    /// Append one entry.
    fn append(&self, entry: &LogEntry) -> std::io::Result<()>;

    /// Oldest `limit` lines currently stored.
    fn read(&self, limit: usize) -> std::io::Result<Vec<String>>;

    /// Remove all stored entries.
    fn clear(&self) -> std::io::Result<()>;
}

/// In-memory sink, used in tests and as the drop target when diagnostics
/// are disabled.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries appended so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

impl LogSink for MemorySink {
    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(entry.clone());
        Ok(())
    }

    fn read(&self, limit: usize) -> std::io::Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .take(limit)
            .map(LogEntry::format_line)
            .collect())
    }

    fn clear(&self) -> std::io::Result<()> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
        Ok(())
    }
}

/// File-backed sink, one formatted line per entry.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink writing to `path`. The file is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl LogSink for FileSink {
    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry.format_line())
    }

    fn read(&self, limit: usize) -> std::io::Result<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        Ok(content.lines().take(limit).map(str::to_string).collect())
    }

    fn clear(&self) -> std::io::Result<()> {
        std::fs::write(&self.path, "")
    }
}

/// Gate that applies the debug configuration before forwarding to the sink.
#[derive(Clone)]
pub struct Diagnostics {
    enabled: bool,
    categories: Vec<LogCategory>,
    sink: Arc<dyn LogSink>,
}

impl Diagnostics {
    /// Create a gate over `sink`, recording only the listed categories.
    pub fn new(enabled: bool, categories: &[LogCategory], sink: Arc<dyn LogSink>) -> Self {
        Self {
            enabled,
            categories: categories.to_vec(),
            sink,
        }
    }

    /// A gate that records nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            categories: Vec::new(),
            sink: Arc::new(MemorySink::new()),
        }
    }

    /// Record an entry if its category is enabled. Sink errors are swallowed.
    pub fn log(&self, category: LogCategory, payload: impl Into<String>) {
        if !self.enabled || !self.categories.contains(&category) {
            return;
        }
        let entry = LogEntry::new(category, payload);
        if let Err(error) = self.sink.append(&entry) {
            warn!(%error, "diagnostic sink write failed");
        }
    }

    /// Record a free-form decision note.
    pub fn log_string(&self, payload: impl Into<String>) {
        self.log(LogCategory::String, payload);
    }

    /// Record an outgoing request snapshot.
    pub fn log_request(&self, payload: impl Into<String>) {
        self.log(LogCategory::Request, payload);
    }

    /// Record a response snapshot.
    pub fn log_response(&self, payload: impl Into<String>) {
        self.log(LogCategory::Response, payload);
    }
}
