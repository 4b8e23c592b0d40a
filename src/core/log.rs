//! Log entries and the sink steps and handlers write through

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    /// Raw toolchain output, passed through verbatim.
    Terminal,
}

/// A single log line attached to a build or run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            level,
            step_id: None,
            step_index: None,
        }
    }
}

/// Classify a raw toolchain output line into a log level using
/// keyword and prefix heuristics.
pub fn classify_line(line: &str) -> LogLevel {
    let lower = line.to_lowercase();
    if lower.contains("error") || lower.contains("exception") {
        LogLevel::Error
    } else if lower.contains("warning") || lower.contains("warn") {
        LogLevel::Warning
    } else if lower.contains("success") || lower.contains("built") || lower.contains("synced") {
        LogLevel::Success
    } else if line.starts_with("I/") || line.starts_with("D/") || lower.contains("info") {
        LogLevel::Info
    } else {
        LogLevel::Terminal
    }
}

/// A cloneable sink that steps, handlers and the toolchain write log
/// lines to. The owner decides where lines end up (event bus, buffers,
/// the console).
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<dyn Fn(&str, LogLevel) + Send + Sync>,
}

impl LogSink {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, LogLevel) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// A sink that discards everything.
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    pub fn emit(&self, message: &str, level: LogLevel) {
        (self.inner)(message, level);
    }

    pub fn info(&self, message: &str) {
        self.emit(message, LogLevel::Info);
    }

    pub fn success(&self, message: &str) {
        self.emit(message, LogLevel::Success);
    }

    pub fn warning(&self, message: &str) {
        self.emit(message, LogLevel::Warning);
    }

    pub fn error(&self, message: &str) {
        self.emit(message, LogLevel::Error);
    }

    pub fn terminal(&self, message: &str) {
        self.emit(message, LogLevel::Terminal);
    }

    /// A sink that prefixes every line with a step label before
    /// forwarding to this one.
    pub fn scoped(&self, label: &str) -> LogSink {
        let parent = self.clone();
        let label = label.to_string();
        LogSink::new(move |message, level| {
            parent.emit(&format!("  [{label}] {message}"), level);
        })
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogSink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("Some Exception occurred"), LogLevel::Error);
        assert_eq!(classify_line("Warning: deprecated API"), LogLevel::Warning);
        assert_eq!(classify_line("Built build/app/outputs/app.apk"), LogLevel::Success);
        assert_eq!(classify_line("I/flutter (1234): hello"), LogLevel::Info);
        assert_eq!(classify_line("Launching lib/main.dart..."), LogLevel::Terminal);
    }

    #[test]
    fn test_scoped_sink_prefixes() {
        let lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink = LogSink::new(move |message, _| {
            captured.lock().unwrap().push(message.to_string());
        });

        sink.scoped("Copy Files").info("copying icon.png");

        let lines = lines.lock().unwrap();
        assert_eq!(lines.as_slice(), ["  [Copy Files] copying icon.png"]);
    }
}
