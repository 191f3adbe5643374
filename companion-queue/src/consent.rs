//! Consent gate, the cross-cutting precondition for every mutating operation.

use crate::error::{QueueError, QueueResult};
use std::sync::RwLock;

/// Canonical consent-required message. Fixed and user-facing; asserted
/// verbatim by the UI layer and the test suite.
pub const CONSENT_REQUIRED_MESSAGE: &str = "Cannot submit: consent not granted";

/// Current consent status plus the last consent error shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentState {
    pub granted: bool,
    pub error: Option<String>,
}

/// Gate checked by enqueue and sync before any side effect.
///
/// While consent is absent the gated operation performs no side effect;
/// the gate records the canonical message so the UI can surface it.
/// Granting consent clears that error but does not retry anything.
#[derive(Debug, Default)]
pub struct ConsentGate {
    state: RwLock<ConsentState>,
}

impl ConsentGate {
    /// Creates a gate with consent not granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants consent and clears any recorded consent error.
    pub fn grant(&self) {
        let mut state = self.state.write().unwrap();
        state.granted = true;
        state.error = None;
    }

    /// Revokes consent. Any recorded error is left as-is.
    pub fn revoke(&self) {
        self.state.write().unwrap().granted = false;
    }

    pub fn is_granted(&self) -> bool {
        self.state.read().unwrap().granted
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConsentState {
        self.state.read().unwrap().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().unwrap().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.write().unwrap().error = None;
    }

    /// Passes when consent is granted; otherwise records the canonical
    /// message and fails with [`QueueError::ConsentRequired`].
    pub fn require(&self) -> QueueResult<()> {
        let mut state = self.state.write().unwrap();
        if state.granted {
            Ok(())
        } else {
            state.error = Some(CONSENT_REQUIRED_MESSAGE.to_string());
            Err(QueueError::ConsentRequired)
        }
    }
}
