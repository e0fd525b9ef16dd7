//! Workflow definitions and execution records.

use chrono::{DateTime, Utc};
use deskpilot_action::{ActionErrorKind, ActionResult, ActionType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::validation::validate_definition;

/// Named values available to placeholder substitution.
pub type Context = Map<String, Value>;

fn default_true() -> bool {
    true
}

// =============================================================================
// Definitions
// =============================================================================

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build a workflow from an untyped definition (e.g. planner output).
    ///
    /// The definition is checked with [`validate_definition`] first so the
    /// caller gets every structural problem at once instead of the first
    /// deserialization error.
    pub fn from_value(definition: Value) -> Result<Self, WorkflowError> {
        let report = validate_definition(&definition);
        if !report.valid {
            return Err(WorkflowError::Validation(report.errors.join("; ")));
        }
        Ok(serde_json::from_value(definition)?)
    }
}

/// One action invocation inside a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub action_type: ActionType,
    #[serde(default)]
    pub params: Value,
    /// Pause after the step completes, before the next one starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
    #[serde(default)]
    pub require_confirmation: bool,
}

impl Step {
    pub fn new(action_type: impl Into<ActionType>, params: Value) -> Self {
        Self {
            name: None,
            action_type: action_type.into(),
            params,
            delay_ms: None,
            stop_on_error: true,
            require_confirmation: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn require_confirmation(mut self, require: bool) -> Self {
        self.require_confirmation = require;
        self
    }

    /// Context key for this step's output: its name, or `step_<n>` (1-based)
    /// when unnamed.
    pub fn context_key(&self, index: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("step_{}", index + 1),
        }
    }
}

// =============================================================================
// Execution records
// =============================================================================

/// Lifecycle of a workflow execution.
///
/// `Failed` means a step failed with `stop_on_error`; `Error` means the
/// engine itself could not continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Error,
    Stopped,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::Error => write!(f, "error"),
            ExecutionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of one executed step, with the params as actually sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub action_type: ActionType,
    pub params: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ActionErrorKind>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl StepResult {
    pub(crate) fn from_action(
        index: usize,
        step: &Step,
        params: Value,
        started_at: DateTime<Utc>,
        result: ActionResult,
    ) -> Self {
        Self {
            index,
            name: step.name.clone(),
            action_type: result.action_type,
            params,
            success: result.success,
            output: result.output,
            error: result.error,
            error_kind: result.error_kind,
            started_at,
            duration_ms: result.duration_ms,
        }
    }
}

/// Record of one run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub step_results: Vec<StepResult>,
    /// Initial variables plus the output of every successful step.
    pub context: Context,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    pub(crate) fn start(workflow_name: &str, context: Context) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_name: workflow_name.to_string(),
            status: ExecutionStatus::Running,
            step_results: Vec::new(),
            context,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_milliseconds().max(0) as u64)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Result of checking a workflow definition. Warnings never invalidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
