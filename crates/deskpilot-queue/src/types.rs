//! Task records and queue statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Snapshot of one task. The payload itself is never exposed.
///
/// `result` and `error` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub priority: i32,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    pub(crate) fn queued(name: Option<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            priority,
            status: TaskStatus::Queued,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            result: None,
            error: None,
        }
    }
}

/// Point-in-time queue statistics.
///
/// Terminal counts and the average duration are cumulative over the queue's
/// lifetime and are not affected by history eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub paused: bool,
    pub max_concurrent: usize,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub history_len: usize,
    /// Mean duration of completed tasks, `None` until one completes.
    pub average_duration_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_display_from_str() {
        for status in [
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            let parsed: TaskStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("paused".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_queued_record() {
        let record = TaskRecord::queued(Some("sync".to_string()), 3);
        assert_eq!(record.status, TaskStatus::Queued);
        assert_eq!(record.priority, 3);
        assert!(record.started_at.is_none());
        assert!(record.result.is_none() && record.error.is_none());
    }

    #[test]
    fn test_record_serialization_skips_empty_outcome() {
        let record = TaskRecord::queued(None, 0);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "queued");
        assert!(value.get("result").is_none());
        assert!(value.get("error").is_none());
        assert!(value.get("name").is_none());
    }
}
