//! Bridge Fault Taxonomy
//!
//! Every per-item failure is classified into exactly one [`FaultKind`].
//! Faults are values, not panics: the executor returns them, the orchestrator
//! records them on the item, and the progress view keeps them inspectable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a per-item or batch-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    /// The user or wallet declined the approval request
    ApprovalRejected,
    /// The approval transaction reverted or could not be confirmed
    ApprovalFailed,
    /// The PreCrime verdict was negative
    ValidationFailed,
    /// The simulation infrastructure could not produce a verdict
    SimulationUnavailable,
    /// The bridge transaction could not be submitted, or reverted
    BridgeSubmissionFailed,
    /// The bridge transaction was not confirmed within the timeout
    BridgeConfirmationTimeout,
    /// The active wallet network changed while the batch was running
    NetworkMismatch,
    /// The batch stopped while the item was waiting for another attempt
    BatchCancelled,
}

impl FaultKind {
    /// Stable kebab-case label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::ApprovalRejected => "approval-rejected",
            FaultKind::ApprovalFailed => "approval-failed",
            FaultKind::ValidationFailed => "validation-failed",
            FaultKind::SimulationUnavailable => "simulation-unavailable",
            FaultKind::BridgeSubmissionFailed => "bridge-submission-failed",
            FaultKind::BridgeConfirmationTimeout => "bridge-confirmation-timeout",
            FaultKind::NetworkMismatch => "network-mismatch",
            FaultKind::BatchCancelled => "batch-cancelled",
        }
    }

    /// Whether an automatic re-dispatch of the item is safe.
    ///
    /// Only faults raised before a bridge transaction hash exists qualify. A
    /// confirmation timeout is excluded because the transaction may still land.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FaultKind::ApprovalFailed
                | FaultKind::SimulationUnavailable
                | FaultKind::BridgeSubmissionFailed
        )
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure with a human-readable reason.
///
/// `fatal` marks faults that make further dispatch pointless for the whole
/// batch (lost chain capability, wallet switched networks).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {message}")]
pub struct BridgeFault {
    pub kind: FaultKind,
    pub message: String,
    #[serde(default)]
    pub fatal: bool,
}

impl BridgeFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fatal: false,
        }
    }

    /// Mark this fault as fatal for the batch.
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn approval_rejected(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ApprovalRejected, message)
    }

    pub fn approval_failed(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ApprovalFailed, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ValidationFailed, message)
    }

    pub fn simulation_unavailable(message: impl Into<String>) -> Self {
        Self::new(FaultKind::SimulationUnavailable, message)
    }

    pub fn bridge_submission_failed(message: impl Into<String>) -> Self {
        Self::new(FaultKind::BridgeSubmissionFailed, message)
    }

    pub fn confirmation_timeout(message: impl Into<String>) -> Self {
        Self::new(FaultKind::BridgeConfirmationTimeout, message)
    }

    pub fn network_mismatch(message: impl Into<String>) -> Self {
        Self::new(FaultKind::NetworkMismatch, message)
    }

    pub fn batch_cancelled(message: impl Into<String>) -> Self {
        Self::new(FaultKind::BatchCancelled, message)
    }

    pub fn is_retryable(&self) -> bool {
        !self.fatal && self.kind.is_retryable()
    }
}
