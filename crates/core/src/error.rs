//! Core Error Types
//!
//! Defines the foundational error types used across the Batch Bridge workspace.
//!
//! Per-item bridge faults are NOT errors in this sense: they are recorded on the
//! item (see [`crate::fault`]). `CoreError` covers programming and configuration
//! mistakes such as illegal state transitions or invalid options.

use thiserror::Error;

use crate::item::BridgeStatus;

/// Core error type for the Batch Bridge workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A state machine move that the item lifecycle does not allow
    #[error("Invalid transition for token {token_id}: {from} -> {to}")]
    InvalidTransition {
        token_id: String,
        from: BridgeStatus,
        to: BridgeStatus,
    },

    /// Attempt to bridge without an approval receipt or a passing verdict
    #[error("Gate violation for token {token_id}: {reason}")]
    GateViolation { token_id: String, reason: String },
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid transition error
    pub fn invalid_transition(
        token_id: impl Into<String>,
        from: BridgeStatus,
        to: BridgeStatus,
    ) -> Self {
        Self::InvalidTransition {
            token_id: token_id.into(),
            from,
            to,
        }
    }

    /// Create a gate violation error
    pub fn gate_violation(token_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GateViolation {
            token_id: token_id.into(),
            reason: reason.into(),
        }
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
