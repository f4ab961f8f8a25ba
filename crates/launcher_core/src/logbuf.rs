use std::collections::VecDeque;

use chrono::Utc;
use shared::domain::{LogEntry, LogOrigin};
use tokio::sync::Mutex;

pub const DEFAULT_LOG_CAPACITY: usize = 512;

/// Append-only ordered record of operational messages, bounded by a ring:
/// once full, the oldest entry is evicted per append.
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    pub async fn push(&self, message: impl Into<String>, origin: LogOrigin) {
        let entry = LogEntry {
            message: message.into(),
            origin,
            at: Utc::now(),
        };
        let mut entries = self.entries.lock().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot of the buffered entries, oldest first.
    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/logbuf_tests.rs"]
mod tests;
