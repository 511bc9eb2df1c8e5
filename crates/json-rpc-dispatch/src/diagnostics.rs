//! Injected diagnostic logging
//!
//! The dispatcher and every handler log through a [`DiagnosticLog`] handed to
//! them explicitly. Production code uses [`TracingLog`]; tests can swap in
//! [`MemoryLog`] and assert on what was recorded.

use std::sync::{Arc, Mutex};

use tracing::Level;

/// Sink for diagnostic messages emitted while dispatching.
pub trait DiagnosticLog: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Shared handle to a diagnostic sink
pub type SharedLog = Arc<dyn DiagnosticLog>;

/// Forwards every message to `tracing` under the `json_rpc_dispatch` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl DiagnosticLog for TracingLog {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "json_rpc_dispatch", "{}", message),
            Level::WARN => tracing::warn!(target: "json_rpc_dispatch", "{}", message),
            Level::INFO => tracing::info!(target: "json_rpc_dispatch", "{}", message),
            Level::DEBUG => tracing::debug!(target: "json_rpc_dispatch", "{}", message),
            _ => tracing::trace!(target: "json_rpc_dispatch", "{}", message),
        }
    }
}

/// A recorded diagnostic message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Whether any entry at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.level == level && entry.message.contains(needle))
    }
}

impl DiagnosticLog for MemoryLog {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
            });
        }
    }
}
