use crate::types::DbId;
use crate::validation::ValidationReport;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Automation is invalid: {0}")]
    InvalidAutomation(ValidationReport),

    #[error("Unknown trigger type: '{0}'")]
    UnknownTrigger(String),
}
