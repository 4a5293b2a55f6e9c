//! Execution history entries and per-automation dispatch results.

use serde::{Deserialize, Serialize};

use crate::trigger::TriggerType;
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored status string. Unknown values read back as `Failed`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub timestamp: Timestamp,
    pub level: LogLevel,
    pub message: String,
}

/// One append-only history entry per automation per trigger firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub workflow_id: DbId,
    pub trigger_type: TriggerType,
    pub started_at: Timestamp,
    pub execution_time_ms: u64,
    pub records_affected: u64,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub logs: Vec<ExecutionLogEntry>,
}

/// Outcome of evaluating one automation for one event.
///
/// Serializes to `{workflowId, success, data?, error?, affectedRecords,
/// executionTime, logs}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub workflow_id: DbId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub affected_records: u64,
    /// Milliseconds.
    pub execution_time: u64,
    pub logs: Vec<ExecutionLogEntry>,
}

impl ExecutionResult {
    pub fn from_record(record: &ExecutionRecord, data: Option<serde_json::Value>) -> Self {
        Self {
            workflow_id: record.workflow_id,
            success: record.status == ExecutionStatus::Completed,
            data,
            error: record.error.clone(),
            affected_records: record.records_affected,
            execution_time: record.execution_time_ms,
            logs: record.logs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn result_serializes_with_camel_case_keys() {
        let record = ExecutionRecord {
            workflow_id: 3,
            trigger_type: TriggerType::PropertyUploaded,
            started_at: Utc::now(),
            execution_time_ms: 12,
            records_affected: 0,
            status: ExecutionStatus::Completed,
            error: None,
            campaign_id: None,
            logs: Vec::new(),
        };
        let value = serde_json::to_value(ExecutionResult::from_record(&record, None)).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["affectedRecords"], json!(0));
        assert_eq!(value["executionTime"], json!(12));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn unknown_stored_status_reads_as_failed() {
        assert_eq!(ExecutionStatus::from_str_lossy("completed"), ExecutionStatus::Completed);
        assert_eq!(ExecutionStatus::from_str_lossy("running"), ExecutionStatus::Failed);
    }
}
