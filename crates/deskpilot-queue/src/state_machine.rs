//! Task state machine with validated transitions.
//!
//! Queued -> Running -> Completed/Failed
//! Queued -> Cancelled
//!
//! Terminal states have no outgoing transitions.

use chrono::Utc;
use serde_json::Value;

use crate::error::QueueError;
use crate::types::{TaskRecord, TaskStatus};

/// Validate that a status transition is allowed.
pub fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<(), QueueError> {
    let valid = matches!(
        (from, to),
        (TaskStatus::Queued, TaskStatus::Running)
            | (TaskStatus::Queued, TaskStatus::Cancelled)
            | (TaskStatus::Running, TaskStatus::Completed)
            | (TaskStatus::Running, TaskStatus::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(QueueError::InvalidTransition(from, to))
    }
}

impl TaskRecord {
    /// Move to `Running` and stamp `started_at`.
    pub(crate) fn start(&mut self) -> Result<(), QueueError> {
        validate_transition(self.status, TaskStatus::Running)?;
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Move to `Cancelled`; `completed_at` is the cancellation time.
    pub(crate) fn cancel(&mut self) -> Result<(), QueueError> {
        validate_transition(self.status, TaskStatus::Cancelled)?;
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Move to `Completed` or `Failed` depending on `outcome`.
    pub(crate) fn finish(&mut self, outcome: Result<Value, String>) -> Result<(), QueueError> {
        let to = if outcome.is_ok() {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        validate_transition(self.status, to)?;

        let completed_at = Utc::now();
        self.status = to;
        self.completed_at = Some(completed_at);
        self.duration_ms = self
            .started_at
            .map(|started| (completed_at - started).num_milliseconds().max(0) as u64);
        match outcome {
            Ok(value) => self.result = Some(value),
            Err(message) => self.error = Some(message),
        }
        Ok(())
    }
}
