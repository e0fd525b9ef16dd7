//! Error types for the task queue.

use crate::types::TaskStatus;
use deskpilot_core::error::DeskpilotError;
use uuid::Uuid;

/// Errors from task lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(TaskStatus, TaskStatus),
}

impl From<QueueError> for DeskpilotError {
    fn from(err: QueueError) -> Self {
        DeskpilotError::Queue(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_display() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let err = QueueError::TaskNotFound(id);
        assert_eq!(
            err.to_string(),
            "Task not found: 550e8400-e29b-41d4-a716-446655440000"
        );

        let err = QueueError::InvalidTransition(TaskStatus::Completed, TaskStatus::Running);
        assert_eq!(err.to_string(), "Invalid state transition: completed -> running");
    }

    #[test]
    fn test_queue_error_into_deskpilot_error() {
        let err: DeskpilotError = QueueError::TaskNotFound(Uuid::new_v4()).into();
        assert!(matches!(err, DeskpilotError::Queue(_)));
    }
}
