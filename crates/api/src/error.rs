use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mailivo_core::error::CoreError;
use mailivo_core::services::ServiceError;
use mailivo_engine::EngineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses of
/// the form `{ "error": ..., "code": ... }`. Invalid automations also carry
/// the full validation report under `details`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `mailivo_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A configuration error raised while dispatching a trigger.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A store or upstream service failure.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::InvalidAutomation(report) => {
                    let body = json!({
                        "error": format!("Automation is invalid: {report}"),
                        "code": "VALIDATION_ERROR",
                        "details": report,
                    });
                    return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
                }
                CoreError::UnknownTrigger(t) => (
                    StatusCode::BAD_REQUEST,
                    "UNKNOWN_TRIGGER",
                    format!("Unknown trigger type: '{t}'"),
                ),
            },

            // --- Dispatch configuration errors ---
            AppError::Engine(engine) => match engine {
                EngineError::UnknownTrigger(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_TRIGGER", engine.to_string()),
                EngineError::UnsupportedAction { .. } | EngineError::MalformedAutomation { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "AUTOMATION_CONFIG_ERROR",
                    engine.to_string(),
                ),
                EngineError::Store(service) => classify_service_error(service),
            },

            AppError::Service(service) => classify_service_error(service),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a collaborator failure into an HTTP status, error code, and message.
///
/// - Upstream unavailability and bad upstream responses map to 502.
/// - Storage failures map to 500 with a sanitized message.
fn classify_service_error(err: &ServiceError) -> (StatusCode, &'static str, String) {
    match err {
        ServiceError::Unavailable(_) | ServiceError::InvalidResponse(_) => {
            tracing::warn!(error = %err, "Upstream service error");
            (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
        }
        ServiceError::Storage(msg) => {
            tracing::error!(error = %msg, "Storage error");
            internal()
        }
        ServiceError::MalformedAutomation { .. } => {
            tracing::error!(error = %err, "Stored automation is malformed");
            (StatusCode::UNPROCESSABLE_ENTITY, "AUTOMATION_CONFIG_ERROR", err.to_string())
        }
    }
}
