//! Repository for the append-only `automation_executions` table.

use sqlx::PgPool;
use mailivo_core::types::{DbId, Timestamp};

use crate::models::execution::ExecutionRow;

/// Column list for automation_executions queries.
const COLUMNS: &str = "id, workflow_id, trigger_type, started_at, execution_time_ms, \
    records_affected, status, error, campaign_id, logs, recorded_at";

/// Column values for one new history entry.
#[derive(Debug, Clone)]
pub struct CreateExecution<'a> {
    pub workflow_id: DbId,
    pub trigger_type: &'a str,
    pub started_at: Timestamp,
    pub execution_time_ms: i64,
    pub records_affected: i64,
    pub status: &'a str,
    pub error: Option<&'a str>,
    pub campaign_id: Option<&'a str>,
    pub logs: serde_json::Value,
}

/// Insert and read execution history. There is no update or delete.
pub struct ExecutionRepo;

impl ExecutionRepo {
    /// Append a history entry.
    pub async fn create(pool: &PgPool, input: &CreateExecution<'_>) -> Result<ExecutionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO automation_executions
                (workflow_id, trigger_type, started_at, execution_time_ms,
                 records_affected, status, error, campaign_id, logs)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExecutionRow>(&query)
            .bind(input.workflow_id)
            .bind(input.trigger_type)
            .bind(input.started_at)
            .bind(input.execution_time_ms)
            .bind(input.records_affected)
            .bind(input.status)
            .bind(input.error)
            .bind(input.campaign_id)
            .bind(&input.logs)
            .fetch_one(pool)
            .await
    }

    /// List history for one automation, newest first.
    pub async fn list_for_workflow(
        pool: &PgPool,
        workflow_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM automation_executions
             WHERE workflow_id = $1
             ORDER BY started_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ExecutionRow>(&query)
            .bind(workflow_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Start time of the most recent run of an automation.
    pub async fn last_started_at(pool: &PgPool, workflow_id: DbId) -> Result<Option<Timestamp>, sqlx::Error> {
        let row: (Option<Timestamp>,) =
            sqlx::query_as("SELECT MAX(started_at) FROM automation_executions WHERE workflow_id = $1")
                .bind(workflow_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
