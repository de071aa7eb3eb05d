//! Capped status log mirrored to tracing

use rover_shared::{now_ms, timing};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Severity of a status entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Milliseconds since Unix epoch
    pub timestamp_ms: u64,
    pub text: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            text: text.into(),
            severity,
        }
    }

    /// Render as `HH:MM:SS - text` (UTC)
    pub fn render_line(&self) -> String {
        let secs = (self.timestamp_ms / 1000) % 86_400;
        format!(
            "{:02}:{:02}:{:02} - {}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            self.text
        )
    }
}

/// Shared handle to the status log
#[derive(Debug, Clone)]
pub struct StatusLog {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::with_capacity(timing::STATUS_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append an entry, discarding the oldest once the cap is exceeded
    pub fn append(&self, entry: LogEntry) {
        match entry.severity {
            Severity::Info | Severity::Success => info!("[STATUS] {}", entry.text),
            Severity::Warning => warn!("[STATUS] {}", entry.text),
            Severity::Error => error!("[STATUS] {}", entry.text),
        }

        let mut entries = self.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    pub fn append_with(&self, severity: Severity, text: impl Into<String>) {
        self.append(LogEntry::new(severity, text));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.append(LogEntry::new(Severity::Info, text));
    }

    pub fn success(&self, text: impl Into<String>) {
        self.append(LogEntry::new(Severity::Success, text));
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.append(LogEntry::new(Severity::Warning, text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append(LogEntry::new(Severity::Error, text));
    }

    /// Copy of the retained entries, most recent first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock can't leave the deque half-updated
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_first() {
        let log = StatusLog::new();
        log.info("first");
        log.success("second");

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "second");
        assert_eq!(entries[0].severity, Severity::Success);
        assert_eq!(entries[1].text, "first");
    }

    #[test]
    fn test_cap_discards_oldest() {
        let log = StatusLog::new();
        for i in 0..60 {
            log.info(format!("entry {}", i));
        }

        let entries = log.snapshot();
        assert_eq!(entries.len(), timing::STATUS_LOG_CAPACITY);
        assert_eq!(entries[0].text, "entry 59");
        assert_eq!(entries.last().map(|e| e.text.as_str()), Some("entry 10"));
    }

    #[test]
    fn test_clones_share_entries() {
        let log = StatusLog::with_capacity(3);
        let other = log.clone();
        other.warning("from clone");
        assert_eq!(log.len(), 1);

        log.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn test_render_line() {
        let entry = LogEntry {
            timestamp_ms: (13 * 3600 + 5 * 60 + 9) * 1000,
            text: "Video stream connected".into(),
            severity: Severity::Success,
        };
        assert_eq!(entry.render_line(), "13:05:09 - Video stream connected");
    }
}
