//! Capability provider trait and registry.
//!
//! Defines the `CapabilityProvider` async trait and the explicit registry the
//! executor dispatches through. The registry is built once at startup and
//! injected; there is no process-wide provider table.

pub mod notify;
pub mod wait;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::ActionError;
use crate::types::{ActionType, SafetyLevel};

/// A component performing the actual side effect behind an action type.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// The identifier this provider is registered under.
    fn action_type(&self) -> ActionType;

    fn safety_level(&self) -> SafetyLevel {
        SafetyLevel::Passive
    }

    /// Perform the operation.
    async fn execute(&self, params: &Value) -> Result<Value, ActionError>;

    /// Human-readable description shown when confirmation is requested.
    fn describe(&self, params: &Value) -> String {
        format!("Run {} with {}", self.action_type(), params)
    }
}

/// Adapter registering a plain async closure as a provider.
pub struct FnProvider<F> {
    action_type: ActionType,
    safety_level: SafetyLevel,
    operation: F,
}

impl<F> FnProvider<F> {
    pub fn new(action_type: impl Into<ActionType>, operation: F) -> Self {
        Self {
            action_type: action_type.into(),
            safety_level: SafetyLevel::Passive,
            operation,
        }
    }

    pub fn with_safety_level(mut self, safety_level: SafetyLevel) -> Self {
        self.safety_level = safety_level;
        self
    }
}

#[async_trait]
impl<F, Fut> CapabilityProvider for FnProvider<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
{
    fn action_type(&self) -> ActionType {
        self.action_type.clone()
    }

    fn safety_level(&self) -> SafetyLevel {
        self.safety_level
    }

    async fn execute(&self, params: &Value) -> Result<Value, ActionError> {
        (self.operation)(params.clone()).await
    }
}

/// Map from action type to provider.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    providers: HashMap<ActionType, Arc<dyn CapabilityProvider>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own action type.
    ///
    /// Returns the provider previously registered under that type, if any.
    pub fn register<P>(&mut self, provider: P) -> Option<Arc<dyn CapabilityProvider>>
    where
        P: CapabilityProvider + 'static,
    {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc(
        &mut self,
        provider: Arc<dyn CapabilityProvider>,
    ) -> Option<Arc<dyn CapabilityProvider>> {
        let action_type = provider.action_type();
        tracing::debug!(action_type = %action_type, "Provider registered");
        self.providers.insert(action_type, provider)
    }

    /// Register an async closure under `action_type`.
    pub fn register_fn<F, Fut>(&mut self, action_type: impl Into<ActionType>, operation: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        self.register(FnProvider::new(action_type, operation));
    }

    /// Register the built-in providers that need no platform automation.
    pub fn register_defaults(&mut self) {
        self.register(wait::WaitProvider);
        self.register(notify::NotifyProvider);
    }

    pub fn get(&self, action_type: &str) -> Option<Arc<dyn CapabilityProvider>> {
        self.providers.get(action_type).cloned()
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.providers.contains_key(action_type)
    }

    /// Registered action types, sorted.
    pub fn action_types(&self) -> Vec<ActionType> {
        let mut types: Vec<ActionType> = self.providers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
