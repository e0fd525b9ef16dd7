//! Error types for workflow definition and orchestration.

use deskpilot_core::error::DeskpilotError;

/// Errors raised while building or running workflows.
///
/// Step failures are not errors: they are recorded in the execution's step
/// results. These variants cover malformed definitions and faults in the
/// engine itself.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid workflow: {0}")]
    Validation(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Orchestration failure: {0}")]
    Orchestration(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<WorkflowError> for DeskpilotError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Serialization(e) => DeskpilotError::Serialization(e.to_string()),
            other => DeskpilotError::Workflow(other.to_string()),
        }
    }
}
