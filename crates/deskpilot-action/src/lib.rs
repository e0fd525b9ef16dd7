//! Action dispatch layer for Deskpilot.
//!
//! Maps action-type identifiers to capability providers, routes flagged
//! actions through a confirmation gate, and normalizes every outcome into a
//! uniform [`ActionResult`].

pub mod confirmation;
pub mod error;
pub mod executor;
pub mod provider;
pub mod types;

pub use confirmation::{AutoApprove, ConfirmationGate, DenyAll, PromptGate};
pub use error::{ActionError, ActionErrorKind};
pub use executor::ActionExecutor;
pub use provider::{ActionRegistry, CapabilityProvider, FnProvider};
pub use types::{ActionResult, ActionType, PendingAction, SafetyLevel, SequenceAction};
