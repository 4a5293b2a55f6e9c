use std::sync::Arc;

use mailivo_core::services::{AutomationStore, ExecutionLog};
use mailivo_engine::Dispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every field is behind an `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Automation definitions.
    pub automations: Arc<dyn AutomationStore>,
    /// Append-only execution history.
    pub executions: Arc<dyn ExecutionLog>,
    /// Trigger dispatcher used by the manual trigger endpoint.
    pub dispatcher: Arc<Dispatcher>,
    /// Database pool, when the server runs against Postgres. Only used for
    /// the health probe.
    pub pool: Option<mailivo_db::DbPool>,
}
