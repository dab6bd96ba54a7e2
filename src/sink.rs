//! Output sinks for a copy run
//!
//! A run reports two kinds of text: a human-readable progress log and an
//! append-only exception record. Both are consumed through traits so callers
//! can route them anywhere; sinks are shared across workers and must
//! synchronize internally.

use crate::error::Error;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Human-readable progress messages
pub trait LogSink: Send + Sync {
    fn append_message(&self, message: &str);
}

/// Append-only record of failures
pub trait ExceptionSink: Send + Sync {
    /// Record an exception with its kind, local date, local time and reason
    fn append_exception(&self, kind: &str, date: &str, time: &str, reason: &str);

    /// Record a free-form message
    fn append_custom_message(&self, message: &str);
}

/// Record an error in the exception sink, stamped with the current local time
pub fn record_error(sink: &dyn ExceptionSink, err: &Error) {
    let now = Local::now();
    sink.append_exception(
        err.kind(),
        &now.format("%Y-%m-%d").to_string(),
        &now.format("%H:%M:%S").to_string(),
        &err.to_string(),
    );
}

/// Routes log messages into `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn append_message(&self, message: &str) {
        if message.starts_with("Error") {
            warn!(target: "bamboo_sorter::log", "{}", message);
        } else {
            info!(target: "bamboo_sorter::log", "{}", message);
        }
    }
}

/// Exception record appended to a text file
///
/// Each entry looks like:
///
/// ```text
/// Exception: FileWriteError
/// Date:  2024-03-05
/// Time:   10:15:30
/// Reason: Failed to write ...
/// ```
#[derive(Debug)]
pub struct ExceptionLogFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ExceptionLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = self.write_text(text) {
            error!(path = ?self.path, error = %e, "Failed to write exception log");
        }
    }

    fn write_text(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())
    }
}

impl ExceptionSink for ExceptionLogFile {
    fn append_exception(&self, kind: &str, date: &str, time: &str, reason: &str) {
        self.append(&format!(
            "Exception: {}\nDate:  {}\nTime:   {}\nReason: {}\n\n",
            kind, date, time, reason
        ));
    }

    fn append_custom_message(&self, message: &str) {
        self.append(&format!("{}\n\n", message));
    }
}

/// One entry kept by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionEntry {
    Exception {
        kind: String,
        date: String,
        time: String,
        reason: String,
    },
    Custom(String),
}

/// In-memory log and exception sink
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
    exceptions: Mutex<Vec<ExceptionEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the log messages received so far
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Snapshot of the exception entries received so far
    pub fn exceptions(&self) -> Vec<ExceptionEntry> {
        self.exceptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether any log message contains `needle`
    pub fn has_message(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|m| m.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn append_message(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}

impl ExceptionSink for MemorySink {
    fn append_exception(&self, kind: &str, date: &str, time: &str, reason: &str) {
        self.exceptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ExceptionEntry::Exception {
                kind: kind.to_string(),
                date: date.to_string(),
                time: time.to_string(),
                reason: reason.to_string(),
            });
    }

    fn append_custom_message(&self, message: &str) {
        self.exceptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ExceptionEntry::Custom(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_exception_log_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Log").join("Exception.txt");
        let sink = ExceptionLogFile::new(&path);

        sink.append_exception("IoError", "2024-03-05", "10:15:30", "disk full");
        sink.append_custom_message("Error in copy action");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Exception: IoError\nDate:  2024-03-05\nTime:   10:15:30\nReason: disk full\n\n\
             Error in copy action\n\n"
        );
    }

    #[test]
    fn test_record_error_uses_kind() {
        let sink = MemorySink::new();
        record_error(&sink, &Error::Config("bad".into()));

        let entries = sink.exceptions();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            ExceptionEntry::Exception {
                kind, date, reason, ..
            } => {
                assert_eq!(kind, "ConfigError");
                assert_eq!(date.len(), 10);
                assert!(reason.contains("bad"));
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_memory_sink_is_shared_across_threads() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || sink.append_message(&format!("message {}", i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.messages().len(), 4);
        assert!(sink.has_message("message 3"));
    }
}
