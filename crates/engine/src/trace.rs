//! Per-run log collector.

use chrono::Utc;
use mailivo_core::execution::{ExecutionLogEntry, LogLevel};
use mailivo_core::types::DbId;

/// Collects the log lines stored with an execution record and mirrors each
/// one to `tracing`.
#[derive(Debug)]
pub struct ExecutionTrace {
    automation_id: DbId,
    entries: Vec<ExecutionLogEntry>,
}

impl ExecutionTrace {
    pub fn new(automation_id: DbId) -> Self {
        Self {
            automation_id,
            entries: Vec::new(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(automation_id = self.automation_id, "{message}");
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(automation_id = self.automation_id, "{message}");
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(automation_id = self.automation_id, "{message}");
        self.push(LogLevel::Error, message);
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push(ExecutionLogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    pub fn into_entries(self) -> Vec<ExecutionLogEntry> {
        self.entries
    }
}
