//! Route definitions for automation endpoints.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::automations;
use crate::state::AppState;

/// Routes mounted at `/automations`.
///
/// ```text
/// GET    /                   -> list_automations
/// POST   /                   -> create_automation
/// POST   /validate           -> validate_automation
/// POST   /trigger            -> trigger_automations
/// GET    /{id}               -> get_automation
/// PUT    /{id}               -> update_automation
/// PATCH  /{id}/active        -> set_automation_active
/// GET    /{id}/executions    -> list_executions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(automations::list_automations).post(automations::create_automation),
        )
        .route("/validate", post(automations::validate_automation))
        .route("/trigger", post(automations::trigger_automations))
        .route(
            "/{id}",
            get(automations::get_automation).put(automations::update_automation),
        )
        .route("/{id}/active", patch(automations::set_automation_active))
        .route("/{id}/executions", get(automations::list_executions))
}
