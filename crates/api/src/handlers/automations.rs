//! Handlers for automation management and manual trigger dispatch.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mailivo_core::automation::{Automation, AutomationDraft, AutomationUpdate};
use mailivo_core::error::CoreError;
use mailivo_core::execution::{ExecutionRecord, ExecutionResult};
use mailivo_core::trigger::EventPayload;
use mailivo_core::types::DbId;
use mailivo_core::validation::{self, ValidationReport};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `PATCH /automations/{id}/active`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Request body for `POST /automations/trigger`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub trigger_id: String,
    #[serde(default)]
    pub payload: EventPayload,
}

async fn find_or_404(state: &AppState, id: DbId) -> AppResult<Automation> {
    state
        .automations
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "automation",
            id,
        }))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// POST /automations/validate
///
/// Validate a draft without saving it. Always 200; the report says whether
/// the draft is valid.
pub async fn validate_automation(
    Json(mut draft): Json<AutomationDraft>,
) -> AppResult<Json<DataResponse<ValidationReport>>> {
    draft.normalize();
    Ok(Json(DataResponse {
        data: validation::validate(&draft),
    }))
}

/// POST /automations
pub async fn create_automation(
    State(state): State<AppState>,
    Json(draft): Json<AutomationDraft>,
) -> AppResult<(StatusCode, Json<DataResponse<Automation>>)> {
    let new = validation::build(draft)?;
    let automation = state.automations.create(&new).await?;

    tracing::info!(
        automation_id = automation.id,
        trigger_type = %automation.trigger_type(),
        is_active = automation.is_active,
        "Automation created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: automation })))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /automations
pub async fn list_automations(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Automation>>>> {
    let (limit, offset) = params.resolve(50, 200);
    let automations = state.automations.list(limit, offset).await?;
    Ok(Json(DataResponse { data: automations }))
}

/// GET /automations/{id}
pub async fn get_automation(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Automation>>> {
    let automation = find_or_404(&state, id).await?;
    Ok(Json(DataResponse { data: automation }))
}

/// PUT /automations/{id}
///
/// Edit name, description, conditions or action. The merged automation is
/// re-validated before it is stored.
pub async fn update_automation(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AutomationUpdate>,
) -> AppResult<Json<DataResponse<Automation>>> {
    let existing = find_or_404(&state, id).await?;
    let normalized = validation::build(input.apply_to(&existing))?;

    let automation = state
        .automations
        .update(id, &AutomationUpdate::from(normalized))
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "automation",
            id,
        }))?;

    tracing::info!(automation_id = id, "Automation updated");
    Ok(Json(DataResponse { data: automation }))
}

/// PATCH /automations/{id}/active
///
/// Activation re-validates the stored automation; pausing never fails
/// validation.
pub async fn set_automation_active(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SetActiveRequest>,
) -> AppResult<Json<DataResponse<Automation>>> {
    let existing = find_or_404(&state, id).await?;
    if input.is_active {
        let mut draft = AutomationDraft::from(&existing);
        draft.is_active = true;
        validation::build(draft)?;
    }

    let automation = state
        .automations
        .set_active(id, input.is_active)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "automation",
            id,
        }))?;

    tracing::info!(automation_id = id, is_active = input.is_active, "Automation activation changed");
    Ok(Json(DataResponse { data: automation }))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// POST /automations/trigger
///
/// Dispatch an event synchronously and return one result per automation
/// that ran.
pub async fn trigger_automations(
    State(state): State<AppState>,
    Json(input): Json<TriggerRequest>,
) -> AppResult<Json<DataResponse<Vec<ExecutionResult>>>> {
    let results = state
        .dispatcher
        .dispatch_raw(input.trigger_id.trim(), input.payload)
        .await?;
    Ok(Json(DataResponse { data: results }))
}

/// GET /automations/{id}/executions
///
/// Execution history, newest first.
pub async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ExecutionRecord>>>> {
    find_or_404(&state, id).await?;
    let (limit, offset) = params.resolve(25, 100);
    let executions = state.executions.list_for_workflow(id, limit, offset).await?;
    Ok(Json(DataResponse { data: executions }))
}
