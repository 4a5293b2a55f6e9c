//! Execution history rows.

use mailivo_core::execution::{ExecutionLogEntry, ExecutionRecord, ExecutionStatus};
use mailivo_core::trigger::TriggerType;
use mailivo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `automation_executions` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExecutionRow {
    pub id: DbId,
    pub workflow_id: DbId,
    pub trigger_type: String,
    pub started_at: Timestamp,
    pub execution_time_ms: i64,
    pub records_affected: i64,
    pub status: String,
    pub error: Option<String>,
    pub campaign_id: Option<String>,
    pub logs: serde_json::Value,
    pub recorded_at: Timestamp,
}

/// Decoding failure for a stored execution row.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionRowError {
    #[error("unknown trigger type '{0}'")]
    UnknownTrigger(String),

    #[error("malformed logs: {0}")]
    Logs(#[source] serde_json::Error),
}

impl TryFrom<ExecutionRow> for ExecutionRecord {
    type Error = ExecutionRowError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        let trigger_type: TriggerType = row
            .trigger_type
            .parse()
            .map_err(|_| ExecutionRowError::UnknownTrigger(row.trigger_type.clone()))?;
        let logs: Vec<ExecutionLogEntry> = serde_json::from_value(row.logs).map_err(ExecutionRowError::Logs)?;

        Ok(ExecutionRecord {
            workflow_id: row.workflow_id,
            trigger_type,
            started_at: row.started_at,
            execution_time_ms: row.execution_time_ms.max(0) as u64,
            records_affected: row.records_affected.max(0) as u64,
            status: ExecutionStatus::from_str_lossy(&row.status),
            error: row.error,
            campaign_id: row.campaign_id,
            logs,
        })
    }
}
