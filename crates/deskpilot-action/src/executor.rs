//! Uniform action dispatch.
//!
//! The executor is the only component that touches capability providers.
//! Every outcome, including provider errors and panics, is normalized into an
//! [`ActionResult`]; nothing propagates past this boundary.

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::confirmation::{AutoApprove, ConfirmationGate};
use crate::error::ActionError;
use crate::provider::ActionRegistry;
use crate::types::{ActionResult, ActionType, PendingAction, SafetyLevel, SequenceAction};

/// Dispatches actions to registered providers behind a confirmation gate.
pub struct ActionExecutor {
    registry: ActionRegistry,
    gate: Arc<dyn ConfirmationGate>,
}

impl ActionExecutor {
    /// Create an executor over `registry` consulting `gate` for confirmations.
    pub fn new(registry: ActionRegistry, gate: Arc<dyn ConfirmationGate>) -> Self {
        Self { registry, gate }
    }

    /// Create an executor whose gate approves everything.
    pub fn with_auto_approve(registry: ActionRegistry) -> Self {
        Self::new(registry, Arc::new(AutoApprove))
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Registered action types, for discovery by planning components.
    pub fn available_actions(&self) -> Vec<ActionType> {
        self.registry.action_types()
    }

    /// Execute one action.
    ///
    /// Unknown action types and denied confirmations fail without calling any
    /// provider. Provider failures are captured in the returned result.
    pub async fn execute(
        &self,
        action_type: &str,
        params: Value,
        require_confirmation: bool,
    ) -> ActionResult {
        let action_type = ActionType::from(action_type);
        let started = Instant::now();
        let outcome = self
            .dispatch(&action_type, params, require_confirmation)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                tracing::debug!(action_type = %action_type, duration_ms, "Action succeeded");
                ActionResult::succeeded(action_type, output, duration_ms)
            }
            Err(e) => {
                tracing::warn!(
                    action_type = %action_type,
                    kind = %e.kind(),
                    error = %e,
                    "Action failed"
                );
                ActionResult::failed(action_type, &e, duration_ms)
            }
        }
    }

    async fn dispatch(
        &self,
        action_type: &ActionType,
        params: Value,
        require_confirmation: bool,
    ) -> Result<Value, ActionError> {
        let provider = self
            .registry
            .get(action_type.as_str())
            .ok_or_else(|| ActionError::UnknownAction(action_type.clone()))?;

        let safety_level = provider.safety_level();
        if require_confirmation || safety_level == SafetyLevel::Active {
            let pending = PendingAction::new(
                action_type.clone(),
                params.clone(),
                provider.describe(&params),
                safety_level,
            );
            match self.gate.confirm(&pending).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ActionError::Cancelled(format!(
                        "confirmation denied for {}",
                        action_type
                    )))
                }
                Err(ActionError::Cancelled(reason)) => return Err(ActionError::Cancelled(reason)),
                Err(other) => return Err(ActionError::Cancelled(other.to_string())),
            }
        }

        // Own task so a panicking provider surfaces as a JoinError.
        let handle = tokio::spawn(async move { provider.execute(&params).await });
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(ActionError::ProviderFailure(format!(
                "provider for {} panicked",
                action_type
            ))),
            Err(_) => Err(ActionError::ProviderFailure(format!(
                "provider for {} was cancelled",
                action_type
            ))),
        }
    }

    /// Execute actions strictly in order.
    ///
    /// After a failure the sequence halts unless that entry set
    /// `stop_on_error` to `false`; the failing result is included.
    pub async fn execute_sequence(&self, actions: &[SequenceAction]) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(actions.len());

        for (index, action) in actions.iter().enumerate() {
            let result = self
                .execute(
                    action.action_type.as_str(),
                    action.params.clone(),
                    action.require_confirmation,
                )
                .await;
            let success = result.success;
            results.push(result);

            if !success && action.stop_on_error {
                tracing::info!(
                    index,
                    action_type = %action.action_type,
                    remaining = actions.len() - index - 1,
                    "Sequence halted on failure"
                );
                break;
            }

            if let Some(delay_ms) = action.delay_ms {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        results
    }
}
