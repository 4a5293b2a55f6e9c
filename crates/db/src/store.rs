//! Postgres-backed [`AutomationStore`] and [`ExecutionLog`].

use async_trait::async_trait;
use mailivo_core::automation::{Automation, AutomationUpdate, NewAutomation};
use mailivo_core::execution::ExecutionRecord;
use mailivo_core::services::{AutomationStore, ExecutionLog, ServiceError};
use mailivo_core::trigger::TriggerType;
use mailivo_core::types::{DbId, Timestamp};

use crate::models::automation::{AutomationRow, CreateAutomationRow, UpdateAutomationRow};
use crate::repositories::{AutomationRepo, CreateExecution, ExecutionRepo};
use crate::DbPool;

fn storage(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

fn decode(row: AutomationRow) -> Result<Automation, ServiceError> {
    let id = row.id;
    Automation::try_from(row).map_err(|e| ServiceError::MalformedAutomation {
        id,
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Automations
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgAutomationStore {
    pool: DbPool,
}

impl PgAutomationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AutomationStore for PgAutomationStore {
    /// A row that no longer decodes fails the whole lookup.
    async fn active_for_trigger(&self, trigger: TriggerType) -> Result<Vec<Automation>, ServiceError> {
        let rows = AutomationRepo::list_active_by_trigger(&self.pool, trigger.as_str())
            .await
            .map_err(storage)?;

        rows.into_iter()
            .map(|row| {
                decode(row).inspect_err(|e| {
                    tracing::error!(error = %e, trigger_type = %trigger, "Active automation does not decode");
                })
            })
            .collect()
    }

    async fn create(&self, automation: &NewAutomation) -> Result<Automation, ServiceError> {
        let input = CreateAutomationRow::try_from(automation).map_err(storage)?;
        let row = AutomationRepo::create(&self.pool, &input).await.map_err(storage)?;
        decode(row)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Automation>, ServiceError> {
        AutomationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage)?
            .map(decode)
            .transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Automation>, ServiceError> {
        AutomationRepo::list(&self.pool, limit, offset)
            .await
            .map_err(storage)?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn update(&self, id: DbId, update: &AutomationUpdate) -> Result<Option<Automation>, ServiceError> {
        let input = UpdateAutomationRow::try_from(update).map_err(storage)?;
        AutomationRepo::update(&self.pool, id, &input)
            .await
            .map_err(storage)?
            .map(decode)
            .transpose()
    }

    async fn set_active(&self, id: DbId, is_active: bool) -> Result<Option<Automation>, ServiceError> {
        AutomationRepo::set_active(&self.pool, id, is_active)
            .await
            .map_err(storage)?
            .map(decode)
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Execution history
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgExecutionLog {
    pool: DbPool,
}

impl PgExecutionLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionLog for PgExecutionLog {
    async fn record(&self, entry: &ExecutionRecord) -> Result<(), ServiceError> {
        let logs = serde_json::to_value(&entry.logs).map_err(storage)?;
        let input = CreateExecution {
            workflow_id: entry.workflow_id,
            trigger_type: entry.trigger_type.as_str(),
            started_at: entry.started_at,
            execution_time_ms: i64::try_from(entry.execution_time_ms).unwrap_or(i64::MAX),
            records_affected: i64::try_from(entry.records_affected).unwrap_or(i64::MAX),
            status: entry.status.as_str(),
            error: entry.error.as_deref(),
            campaign_id: entry.campaign_id.as_deref(),
            logs,
        };
        ExecutionRepo::create(&self.pool, &input).await.map_err(storage)?;
        Ok(())
    }

    async fn list_for_workflow(
        &self,
        workflow_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionRecord>, ServiceError> {
        ExecutionRepo::list_for_workflow(&self.pool, workflow_id, limit, offset)
            .await
            .map_err(storage)?
            .into_iter()
            .map(|row| ExecutionRecord::try_from(row).map_err(storage))
            .collect()
    }

    async fn last_started_at(&self, workflow_id: DbId) -> Result<Option<Timestamp>, ServiceError> {
        ExecutionRepo::last_started_at(&self.pool, workflow_id)
            .await
            .map_err(storage)
    }
}
