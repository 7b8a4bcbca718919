//! BridgeItem State Machine
//!
//! Lifecycle of a single NFT moving through the bridge:
//!
//! ```text
//! pending -> approving -> bridging -> success
//!    |           |            |
//!    +-----------+------------+-----> failed --(retry)--> pending
//! ```
//!
//! Transitions only move forward. `retry` is the single way back and is only
//! allowed from `failed`. Entering `bridging` requires an approval receipt and
//! a passing PreCrime verdict; the check lives here so that no caller can skip
//! the gate.

use serde::{Deserialize, Serialize};

use crate::capability::ApprovalReceipt;
use crate::error::{CoreError, CoreResult};
use crate::fault::{BridgeFault, FaultKind};
use crate::types::{DestinationChain, TokenId, TxHash};
use crate::verdict::PreCrimeValidationResult;

/// Status of a bridge item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    /// Waiting to be dispatched
    Pending,
    /// Approval submitted or being checked
    Approving,
    /// Bridge transaction submitted or awaiting confirmation
    Bridging,
    /// Bridged and confirmed
    Success,
    /// Failed; `error` explains why
    Failed,
}

impl BridgeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeStatus::Success | BridgeStatus::Failed)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, BridgeStatus::Approving | BridgeStatus::Bridging)
    }
}

impl std::fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeStatus::Pending => write!(f, "pending"),
            BridgeStatus::Approving => write!(f, "approving"),
            BridgeStatus::Bridging => write!(f, "bridging"),
            BridgeStatus::Success => write!(f, "success"),
            BridgeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One item being moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeItem {
    token_id: TokenId,
    destination: DestinationChain,
    status: BridgeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fault: Option<FaultKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pre_crime_result: Option<PreCrimeValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    approval: Option<ApprovalReceipt>,
    #[serde(default)]
    attempts: u32,
}

impl BridgeItem {
    /// Create a pending item.
    pub fn new(token_id: impl Into<TokenId>, destination: DestinationChain) -> Self {
        Self {
            token_id: token_id.into(),
            destination,
            status: BridgeStatus::Pending,
            transaction_hash: None,
            error: None,
            fault: None,
            pre_crime_result: None,
            approval: None,
            attempts: 0,
        }
    }

    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    pub fn destination(&self) -> &DestinationChain {
        &self.destination
    }

    pub fn status(&self) -> BridgeStatus {
        self.status
    }

    pub fn transaction_hash(&self) -> Option<&TxHash> {
        self.transaction_hash.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn fault(&self) -> Option<FaultKind> {
        self.fault
    }

    pub fn pre_crime_result(&self) -> Option<&PreCrimeValidationResult> {
        self.pre_crime_result.as_ref()
    }

    pub fn approval(&self) -> Option<&ApprovalReceipt> {
        self.approval.as_ref()
    }

    /// Number of times the item has been dispatched.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn reject(&self, to: BridgeStatus) -> CoreError {
        CoreError::invalid_transition(self.token_id.as_str(), self.status, to)
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// `pending -> approving`.
    pub fn begin_approval(&mut self) -> CoreResult<()> {
        if self.status != BridgeStatus::Pending {
            return Err(self.reject(BridgeStatus::Approving));
        }
        self.status = BridgeStatus::Approving;
        self.attempts += 1;
        Ok(())
    }

    /// Record the approval receipt reported by the executor.
    pub fn record_approval(&mut self, receipt: ApprovalReceipt) -> CoreResult<()> {
        if self.status != BridgeStatus::Approving {
            return Err(CoreError::validation(format!(
                "cannot record approval for token {} while {}",
                self.token_id, self.status
            )));
        }
        self.approval = Some(receipt);
        Ok(())
    }

    /// Record a PreCrime verdict. The latest verdict wins.
    pub fn record_verdict(&mut self, verdict: PreCrimeValidationResult) -> CoreResult<()> {
        if self.status != BridgeStatus::Approving {
            return Err(CoreError::validation(format!(
                "cannot record verdict for token {} while {}",
                self.token_id, self.status
            )));
        }
        self.pre_crime_result = Some(verdict);
        Ok(())
    }

    /// `approving -> bridging`, gated on approval receipt and verdict.
    pub fn begin_bridging(&mut self) -> CoreResult<()> {
        if self.status != BridgeStatus::Approving {
            return Err(self.reject(BridgeStatus::Bridging));
        }
        if self.approval.is_none() {
            return Err(CoreError::gate_violation(
                self.token_id.as_str(),
                "no approval receipt recorded",
            ));
        }
        match &self.pre_crime_result {
            None => {
                return Err(CoreError::gate_violation(
                    self.token_id.as_str(),
                    "no PreCrime verdict recorded",
                ))
            }
            Some(verdict) if !verdict.passes() => {
                return Err(CoreError::gate_violation(
                    self.token_id.as_str(),
                    format!(
                        "PreCrime verdict did not pass (isValid={}, success={})",
                        verdict.is_valid, verdict.success
                    ),
                ))
            }
            Some(_) => {}
        }
        self.status = BridgeStatus::Bridging;
        Ok(())
    }

    /// Record the bridge transaction hash. Setting the same hash twice is a no-op.
    pub fn record_transaction_hash(&mut self, hash: TxHash) -> CoreResult<()> {
        if self.status != BridgeStatus::Bridging {
            return Err(CoreError::validation(format!(
                "cannot record transaction hash for token {} while {}",
                self.token_id, self.status
            )));
        }
        match &self.transaction_hash {
            Some(existing) if *existing != hash => Err(CoreError::validation(format!(
                "transaction hash for token {} already set to {}",
                self.token_id, existing
            ))),
            Some(_) => Ok(()),
            None => {
                self.transaction_hash = Some(hash);
                Ok(())
            }
        }
    }

    /// `bridging -> success`.
    pub fn succeed(&mut self) -> CoreResult<()> {
        if self.status != BridgeStatus::Bridging {
            return Err(self.reject(BridgeStatus::Success));
        }
        if self.transaction_hash.is_none() {
            return Err(CoreError::validation(format!(
                "token {} cannot succeed without a transaction hash",
                self.token_id
            )));
        }
        self.status = BridgeStatus::Success;
        Ok(())
    }

    /// Move to `failed`, recording the fault.
    pub fn fail(&mut self, fault: &BridgeFault) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(self.reject(BridgeStatus::Failed));
        }
        self.status = BridgeStatus::Failed;
        self.error = Some(fault.message.clone());
        self.fault = Some(fault.kind);
        Ok(())
    }

    /// `failed -> pending`. Clears everything a fresh attempt must re-establish.
    pub fn retry(&mut self) -> CoreResult<()> {
        if self.status != BridgeStatus::Failed {
            return Err(self.reject(BridgeStatus::Pending));
        }
        self.status = BridgeStatus::Pending;
        self.error = None;
        self.fault = None;
        self.transaction_hash = None;
        self.approval = None;
        self.pre_crime_result = None;
        Ok(())
    }
}
