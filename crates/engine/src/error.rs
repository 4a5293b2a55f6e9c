use mailivo_core::services::ServiceError;
use mailivo_core::types::DbId;

/// Configuration errors. Returned from dispatch and never swallowed: they
/// mean a caller or an admin tool produced something the engine cannot run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown trigger type: '{0}'")]
    UnknownTrigger(String),

    #[error("Automation {automation_id} uses unsupported action type '{action_type}'")]
    UnsupportedAction {
        automation_id: DbId,
        action_type: String,
    },

    #[error("Automation {automation_id} is malformed: {reason}")]
    MalformedAutomation { automation_id: DbId, reason: String },

    #[error("Automation store error: {0}")]
    Store(ServiceError),
}

impl From<ServiceError> for EngineError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::MalformedAutomation { id, reason } => EngineError::MalformedAutomation {
                automation_id: id,
                reason,
            },
            other => EngineError::Store(other),
        }
    }
}

/// Failures of a single automation run. Caught per automation and recorded
/// as a failed execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Data source error: {0}")]
    DataSource(ServiceError),

    #[error("Campaign service error: {0}")]
    CampaignService(ServiceError),

    #[error("Campaign service timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),

    #[error("Unsupported action type: '{0}'")]
    UnsupportedAction(String),
}
