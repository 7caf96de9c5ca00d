//! In-app event journal
//!
//! The journal is the user-visible log screen: an in-memory, time-ordered
//! sequence of lifecycle and diagnostic events. It is separate from the
//! `tracing` developer log; entries here are short, human-readable lines the
//! UI renders directly.
//!
//! Appends may come from any task (the background batch pump, the reporter
//! tick, the controller), so the buffer sits behind a mutex. The buffer is
//! bounded: once `capacity` entries are held, the oldest entry is dropped on
//! each append.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Severity of a journal entry, used for display styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Success => "success",
        };
        f.write_str(label)
    }
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Wall-clock time of day the entry was appended, e.g. "14:03:51"
    pub timestamp: String,
    pub message: String,
    pub severity: Severity,
}

/// Bounded, append-only journal shared across tasks.
///
/// Cloning is cheap; all clones share the same buffer.
#[derive(Debug, Clone)]
pub struct Journal {
    inner: Arc<Mutex<JournalInner>>,
}

#[derive(Debug)]
struct JournalInner {
    entries: VecDeque<JournalEntry>,
    capacity: usize,
}

/// Default maximum number of retained entries.
pub const DEFAULT_CAPACITY: usize = 1000;

impl Default for Journal {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Journal {
    /// Create a journal retaining at most `capacity` entries.
    ///
    /// A zero capacity is treated as 1 so an append is always observable.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(JournalInner {
                entries: VecDeque::new(),
                capacity: capacity.max(1),
            })),
        }
    }

    /// Append an entry stamped with the current local time of day.
    pub fn append(&self, severity: Severity, message: impl Into<String>) {
        self.append_entry(JournalEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
            severity,
        });
    }

    /// Append a pre-stamped entry. Drops the oldest entry when full.
    pub fn append_entry(&self, entry: JournalEntry) {
        let mut inner = self.inner.lock().expect("journal lock poisoned");
        if inner.entries.len() == inner.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.append(Severity::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.append(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(Severity::Error, message);
    }

    /// Full ordered sequence, oldest first.
    pub fn snapshot(&self) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .expect("journal lock poisoned")
            .entries
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("journal lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the journal.
    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("journal lock poisoned")
            .entries
            .clear();
    }
}
