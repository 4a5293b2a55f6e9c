//! Repository for the `automations` table.

use sqlx::PgPool;
use mailivo_core::types::DbId;

use crate::models::automation::{AutomationRow, CreateAutomationRow, UpdateAutomationRow};

/// Column list for automations queries.
const COLUMNS: &str = "id, user_id, name, description, is_active, trigger_type, trigger_json, \
    conditions_json, action_json, created_at, updated_at";

/// Provides CRUD operations for automations.
pub struct AutomationRepo;

impl AutomationRepo {
    /// Insert a new automation, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateAutomationRow) -> Result<AutomationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO automations
                (user_id, name, description, is_active, trigger_type,
                 trigger_json, conditions_json, action_json)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationRow>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.is_active)
            .bind(&input.trigger_type)
            .bind(&input.trigger_json)
            .bind(&input.conditions_json)
            .bind(&input.action_json)
            .fetch_one(pool)
            .await
    }

    /// Find an automation by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AutomationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM automations WHERE id = $1");
        sqlx::query_as::<_, AutomationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List automations, newest first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<AutomationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM automations
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, AutomationRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Active automations for one trigger type, oldest first.
    pub async fn list_active_by_trigger(
        pool: &PgPool,
        trigger_type: &str,
    ) -> Result<Vec<AutomationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM automations
             WHERE is_active AND trigger_type = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, AutomationRow>(&query)
            .bind(trigger_type)
            .fetch_all(pool)
            .await
    }

    /// Update the editable fields. Returns the updated row, or `None` if not found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAutomationRow,
    ) -> Result<Option<AutomationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE automations SET
                name            = COALESCE($1, name),
                description     = COALESCE($2, description),
                conditions_json = COALESCE($3, conditions_json),
                action_json     = COALESCE($4, action_json),
                updated_at      = now()
             WHERE id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationRow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.conditions_json)
            .bind(&input.action_json)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Activate or pause an automation. Returns the updated row, or `None` if not found.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<AutomationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE automations SET is_active = $1, updated_at = now()
             WHERE id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AutomationRow>(&query)
            .bind(is_active)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
