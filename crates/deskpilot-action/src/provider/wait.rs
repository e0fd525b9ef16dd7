//! Wait action provider.
//!
//! Pauses for a fixed number of milliseconds. Useful between UI steps that
//! need the desktop to settle.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::ActionError;
use crate::provider::CapabilityProvider;
use crate::types::{ActionType, SafetyLevel};

/// Provider for `wait` actions (Passive safety level).
///
/// Params: `{"ms": <non-negative integer>}`. A numeric string is accepted
/// too, since templated params arrive stringified.
pub struct WaitProvider;

fn requested_ms(params: &Value) -> Result<u64, ActionError> {
    let ms = params.get("ms");
    ms.and_then(|v| v.as_u64())
        .or_else(|| ms.and_then(|v| v.as_str()).and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| {
            ActionError::InvalidParams("wait requires a non-negative integer `ms`".to_string())
        })
}

#[async_trait]
impl CapabilityProvider for WaitProvider {
    fn action_type(&self) -> ActionType {
        ActionType::from("wait")
    }

    fn safety_level(&self) -> SafetyLevel {
        SafetyLevel::Passive
    }

    async fn execute(&self, params: &Value) -> Result<Value, ActionError> {
        let ms = requested_ms(params)?;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "waited_ms": ms }))
    }

    fn describe(&self, params: &Value) -> String {
        match requested_ms(params) {
            Ok(ms) => format!("Wait {} ms", ms),
            Err(_) => "Wait <invalid duration>".to_string(),
        }
    }
}
