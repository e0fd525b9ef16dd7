//! Core types and value objects for the action layer.

use crate::error::{ActionError, ActionErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Identifiers and enums
// =============================================================================

/// Identifier of a registered capability (e.g. `screen_capture`, `file_write`).
///
/// The set is open: providers register new identifiers without changes here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionType(String);

impl ActionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ActionType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Safety classification for capability providers.
///
/// `Active` providers perform destructive or externally visible side effects
/// and always pass through the confirmation gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    #[default]
    Passive,
    Active,
}

// =============================================================================
// Results
// =============================================================================

/// Uniform outcome of a single action.
///
/// `output` and `error` are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ActionErrorKind>,
    pub duration_ms: u64,
}

impl ActionResult {
    pub fn succeeded(action_type: ActionType, output: Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            action_type,
            output: Some(output),
            error: None,
            error_kind: None,
            duration_ms,
        }
    }

    pub fn failed(action_type: ActionType, error: &ActionError, duration_ms: u64) -> Self {
        Self {
            success: false,
            action_type,
            output: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            duration_ms,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// An action awaiting approval from a [`crate::ConfirmationGate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: Uuid,
    pub action_type: ActionType,
    pub params: Value,
    /// Human-readable description from the provider.
    pub description: String,
    pub safety_level: SafetyLevel,
    pub requested_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(
        action_type: ActionType,
        params: Value,
        description: String,
        safety_level: SafetyLevel,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_type,
            params,
            description,
            safety_level,
            requested_at: Utc::now(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One entry of an [`crate::ActionExecutor::execute_sequence`] batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceAction {
    pub action_type: ActionType,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub require_confirmation: bool,
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl SequenceAction {
    pub fn new(action_type: impl Into<ActionType>, params: Value) -> Self {
        Self {
            action_type: action_type.into(),
            params,
            require_confirmation: false,
            stop_on_error: true,
            delay_ms: None,
        }
    }

    pub fn require_confirmation(mut self, require: bool) -> Self {
        self.require_confirmation = require;
        self
    }

    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}
