//! Error types for the action layer.

use crate::types::ActionType;
use deskpilot_core::error::DeskpilotError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors from action dispatch and provider execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Unknown action type: {0}")]
    UnknownAction(ActionType),
    #[error("Action cancelled: {0}")]
    Cancelled(String),
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    /// Provider message, passed through verbatim.
    #[error("{0}")]
    ProviderFailure(String),
}

impl ActionError {
    /// Classify this error for callers that branch on the failure category.
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            ActionError::UnknownAction(_) => ActionErrorKind::UnknownAction,
            ActionError::Cancelled(_) => ActionErrorKind::Cancelled,
            ActionError::InvalidParams(_) => ActionErrorKind::InvalidParams,
            ActionError::ProviderFailure(_) => ActionErrorKind::ProviderFailure,
        }
    }
}

/// Serializable failure category carried on [`crate::ActionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    UnknownAction,
    Cancelled,
    InvalidParams,
    ProviderFailure,
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionErrorKind::UnknownAction => write!(f, "unknown_action"),
            ActionErrorKind::Cancelled => write!(f, "cancelled"),
            ActionErrorKind::InvalidParams => write!(f, "invalid_params"),
            ActionErrorKind::ProviderFailure => write!(f, "provider_failure"),
        }
    }
}

impl From<ActionError> for DeskpilotError {
    fn from(err: ActionError) -> Self {
        DeskpilotError::Action(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_display() {
        let err = ActionError::UnknownAction(ActionType::from("mouse_click"));
        assert_eq!(err.to_string(), "Unknown action type: mouse_click");

        let err = ActionError::Cancelled("confirmation denied".to_string());
        assert_eq!(err.to_string(), "Action cancelled: confirmation denied");

        let err = ActionError::InvalidParams("missing path".to_string());
        assert_eq!(err.to_string(), "Invalid parameters: missing path");
    }

    #[test]
    fn test_provider_failure_is_verbatim() {
        let err = ActionError::ProviderFailure("EACCES: permission denied".to_string());
        assert_eq!(err.to_string(), "EACCES: permission denied");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ActionError::UnknownAction(ActionType::from("x")).kind(),
            ActionErrorKind::UnknownAction
        );
        assert_eq!(
            ActionError::Cancelled(String::new()).kind(),
            ActionErrorKind::Cancelled
        );
        assert_eq!(
            ActionError::ProviderFailure(String::new()).kind(),
            ActionErrorKind::ProviderFailure
        );
        assert_eq!(ActionErrorKind::InvalidParams.to_string(), "invalid_params");
    }

    #[test]
    fn test_action_error_into_deskpilot_error() {
        let err: DeskpilotError = ActionError::Cancelled("no".to_string()).into();
        assert!(matches!(err, DeskpilotError::Action(_)));
        assert!(err.to_string().contains("no"));
    }
}
