//! Simulation Checks
//!
//! Each check inspects a [`SimulationTrace`] and reports a [`CheckResult`].
//! Checks are pure functions of the trace and the destination, which is what
//! makes the gate idempotent for an unchanged destination state.

use batch_bridge_core::{DestinationChain, SimulationTrace};

use crate::models::{CheckPhase, CheckResult};

/// Default gas ceiling for [`GasCeilingCheck`].
pub const DEFAULT_GAS_CEILING: u64 = 500_000;

/// Default fork staleness tolerance for [`StaleSnapshotCheck`], in blocks.
pub const DEFAULT_MAX_SNAPSHOT_AGE_BLOCKS: u64 = 32;

/// A check run over a simulation trace.
pub trait SimulationCheck: Send + Sync {
    /// Stable identifier used in reports.
    fn id(&self) -> &str;

    /// Phase this check belongs to.
    fn phase(&self) -> CheckPhase;

    fn check(&self, trace: &SimulationTrace, destination: &DestinationChain) -> CheckResult;
}

// ============================================================================
// Validity
// ============================================================================

/// Fails when the simulated call reverted.
#[derive(Debug, Default, Clone)]
pub struct RevertCheck;

impl SimulationCheck for RevertCheck {
    fn id(&self) -> &str {
        "revert"
    }

    fn phase(&self) -> CheckPhase {
        CheckPhase::Validity
    }

    fn check(&self, trace: &SimulationTrace, _destination: &DestinationChain) -> CheckResult {
        if trace.reverted {
            let reason = trace.revert_reason.as_deref().unwrap_or("unknown reason");
            CheckResult::failed(self.id(), self.phase(), format!("revert: {}", reason))
        } else {
            CheckResult::passed(self.id(), self.phase())
        }
    }
}

/// Fails when the simulated destination owner differs from the requested recipient.
#[derive(Debug, Default, Clone)]
pub struct RecipientCheck;

impl SimulationCheck for RecipientCheck {
    fn id(&self) -> &str {
        "recipient"
    }

    fn phase(&self) -> CheckPhase {
        CheckPhase::Validity
    }

    fn check(&self, trace: &SimulationTrace, destination: &DestinationChain) -> CheckResult {
        match &trace.destination_owner {
            None => CheckResult::skipped(self.id(), self.phase(), "trace carries no destination owner"),
            Some(owner) if owner.eq_ignore_ascii_case(&destination.recipient) => {
                CheckResult::passed(self.id(), self.phase())
            }
            Some(owner) => CheckResult::failed(
                self.id(),
                self.phase(),
                format!(
                    "destination owner {} does not match recipient {}",
                    owner, destination.recipient
                ),
            ),
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Fails when the simulated return path reports an unsuccessful outcome.
#[derive(Debug, Default, Clone)]
pub struct ReturnStatusCheck;

impl SimulationCheck for ReturnStatusCheck {
    fn id(&self) -> &str {
        "return_status"
    }

    fn phase(&self) -> CheckPhase {
        CheckPhase::Outcome
    }

    fn check(&self, trace: &SimulationTrace, _destination: &DestinationChain) -> CheckResult {
        if trace.return_success {
            CheckResult::passed(self.id(), self.phase())
        } else {
            CheckResult::failed(
                self.id(),
                self.phase(),
                "simulated call returned an unsuccessful status",
            )
        }
    }
}

// ============================================================================
// Advisory
// ============================================================================

/// Warns when the simulated call used more gas than expected.
#[derive(Debug, Clone)]
pub struct GasCeilingCheck {
    pub max_gas: u64,
}

impl Default for GasCeilingCheck {
    fn default() -> Self {
        Self {
            max_gas: DEFAULT_GAS_CEILING,
        }
    }
}

impl SimulationCheck for GasCeilingCheck {
    fn id(&self) -> &str {
        "gas_ceiling"
    }

    fn phase(&self) -> CheckPhase {
        CheckPhase::Advisory
    }

    fn check(&self, trace: &SimulationTrace, _destination: &DestinationChain) -> CheckResult {
        if trace.gas_used > self.max_gas {
            CheckResult::failed(
                self.id(),
                self.phase(),
                format!(
                    "gas used {} exceeds ceiling {}",
                    trace.gas_used, self.max_gas
                ),
            )
        } else {
            CheckResult::passed(self.id(), self.phase())
        }
    }
}

/// Warns when the fork was taken too far behind the destination head.
///
/// A stale fork is the main reason two validations of the same item can
/// disagree, so it is surfaced instead of hidden.
#[derive(Debug, Clone)]
pub struct StaleSnapshotCheck {
    pub max_age_blocks: u64,
}

impl Default for StaleSnapshotCheck {
    fn default() -> Self {
        Self {
            max_age_blocks: DEFAULT_MAX_SNAPSHOT_AGE_BLOCKS,
        }
    }
}

impl SimulationCheck for StaleSnapshotCheck {
    fn id(&self) -> &str {
        "stale_snapshot"
    }

    fn phase(&self) -> CheckPhase {
        CheckPhase::Advisory
    }

    fn check(&self, trace: &SimulationTrace, _destination: &DestinationChain) -> CheckResult {
        let Some(head) = trace.head_block else {
            return CheckResult::skipped(self.id(), self.phase(), "trace carries no head block");
        };
        let age = head.saturating_sub(trace.fork_block);
        if age > self.max_age_blocks {
            CheckResult::failed(
                self.id(),
                self.phase(),
                format!(
                    "fork block {} is {} blocks behind head {}",
                    trace.fork_block, age, head
                ),
            )
        } else {
            CheckResult::passed(self.id(), self.phase())
        }
    }
}
