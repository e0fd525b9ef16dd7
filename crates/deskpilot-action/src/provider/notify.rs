//! Notify action provider.
//!
//! Surfaces a message to the user through the log stream and echoes it back
//! as the action output.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ActionError;
use crate::provider::CapabilityProvider;
use crate::types::{ActionType, SafetyLevel};

/// Provider for `notify` actions (Passive safety level).
///
/// Params: `{"message": <string>, "title": <optional string>}`.
pub struct NotifyProvider;

#[async_trait]
impl CapabilityProvider for NotifyProvider {
    fn action_type(&self) -> ActionType {
        ActionType::from("notify")
    }

    fn safety_level(&self) -> SafetyLevel {
        SafetyLevel::Passive
    }

    async fn execute(&self, params: &Value) -> Result<Value, ActionError> {
        let message = params
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        if message.is_empty() {
            return Err(ActionError::InvalidParams(
                "Notification message must not be empty".to_string(),
            ));
        }

        let title = params
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Deskpilot");

        tracing::info!(title = %title, message = %message, "Notification shown");

        Ok(Value::String(message.to_string()))
    }

    fn describe(&self, params: &Value) -> String {
        let message = params
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("<no message>");
        let preview: String = message.chars().take(50).collect();
        format!("Show notification: {}", preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_notify_valid_params() {
        let out = NotifyProvider
            .execute(&json!({"title": "Build", "message": "done"}))
            .await
            .unwrap();
        assert_eq!(out, json!("done"));
    }

    #[tokio::test]
    async fn test_notify_empty_message() {
        let err = NotifyProvider
            .execute(&json!({"message": ""}))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_notify_missing_message() {
        let err = NotifyProvider.execute(&json!({})).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidParams(_)));
    }

    #[test]
    fn test_notify_describe_truncates() {
        let long = "x".repeat(80);
        let desc = NotifyProvider.describe(&json!({ "message": long }));
        assert_eq!(desc, format!("Show notification: {}", "x".repeat(50)));
    }
}
