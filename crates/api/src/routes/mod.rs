pub mod automations;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /automations                      list, create
/// /automations/validate             validate a draft
/// /automations/trigger              dispatch a trigger event
/// /automations/{id}                 get, update
/// /automations/{id}/active          activate / pause
/// /automations/{id}/executions      execution history
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/automations", automations::router())
}
