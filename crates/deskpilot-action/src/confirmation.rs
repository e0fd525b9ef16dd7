//! User confirmation flow for action execution.
//!
//! The executor consults a [`ConfirmationGate`] before running an action that
//! was flagged for confirmation or whose provider is [`SafetyLevel::Active`].
//! A negative answer or an aborted request cancels the action.
//!
//! [`SafetyLevel::Active`]: crate::types::SafetyLevel::Active

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::ActionError;
use crate::types::PendingAction;

/// Pluggable approval check.
///
/// `Ok(true)` approves, `Ok(false)` denies, `Err(_)` means the request was
/// aborted before an answer arrived.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, pending: &PendingAction) -> Result<bool, ActionError>;
}

/// Gate that approves everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl ConfirmationGate for AutoApprove {
    async fn confirm(&self, pending: &PendingAction) -> Result<bool, ActionError> {
        tracing::debug!(action_type = %pending.action_type, "Auto-approved");
        Ok(true)
    }
}

/// Gate that denies everything. Useful for dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

#[async_trait]
impl ConfirmationGate for DenyAll {
    async fn confirm(&self, _pending: &PendingAction) -> Result<bool, ActionError> {
        Ok(false)
    }
}

struct PromptEntry {
    request: PendingAction,
    responder: oneshot::Sender<bool>,
}

/// Gate that queues requests for a human-facing front-end.
///
/// The front-end lists requests with [`PromptGate::pending`] and answers them
/// with [`PromptGate::approve`] or [`PromptGate::dismiss`]. A request left
/// unanswered for longer than the configured timeout is aborted.
pub struct PromptGate {
    timeout: Duration,
    pending: Mutex<VecDeque<PromptEntry>>,
}

impl PromptGate {
    /// Create a prompt gate that aborts unanswered requests after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PromptEntry>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the requests awaiting an answer, oldest first.
    pub fn pending(&self) -> Vec<PendingAction> {
        self.lock().iter().map(|e| e.request.clone()).collect()
    }

    /// Return the number of pending confirmations.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Approve a pending request.
    ///
    /// Returns `true` if the request was found and answered.
    pub fn approve(&self, id: Uuid) -> bool {
        self.answer(id, true)
    }

    /// Deny a pending request.
    ///
    /// Returns `true` if the request was found and answered.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.answer(id, false)
    }

    fn answer(&self, id: Uuid, approved: bool) -> bool {
        let entry = {
            let mut pending = self.lock();
            match pending.iter().position(|e| e.request.id == id) {
                Some(pos) => pending.remove(pos),
                None => None,
            }
        };
        match entry {
            // The waiting side may already have timed out; that still counts as answered here.
            Some(entry) => {
                let _ = entry.responder.send(approved);
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: Uuid) {
        let mut pending = self.lock();
        if let Some(pos) = pending.iter().position(|e| e.request.id == id) {
            pending.remove(pos);
        }
    }
}

#[async_trait]
impl ConfirmationGate for PromptGate {
    async fn confirm(&self, pending: &PendingAction) -> Result<bool, ActionError> {
        let (tx, rx) = oneshot::channel();
        self.lock().push_back(PromptEntry {
            request: pending.clone(),
            responder: tx,
        });
        tracing::info!(
            request_id = %pending.id,
            action_type = %pending.action_type,
            description = %pending.description,
            "Confirmation requested"
        );

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(approved)) => Ok(approved),
            Ok(Err(_)) => Err(ActionError::Cancelled(
                "confirmation request dropped".to_string(),
            )),
            Err(_) => {
                self.remove(pending.id);
                Err(ActionError::Cancelled(format!(
                    "confirmation timed out after {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}
