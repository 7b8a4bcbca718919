//! Batch Report Models

use batch_bridge_core::{BridgeFault, TokenId};
use serde::{Deserialize, Serialize};

use super::progress::BatchBridgeProgress;

/// Why a batch stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BatchTermination {
    /// Every item was dispatched and reached a terminal status
    Completed,
    /// The caller cancelled the batch
    Cancelled,
    /// A batch-fatal fault stopped dispatch
    Aborted { fault: BridgeFault },
}

impl BatchTermination {
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchTermination::Completed)
    }
}

/// Final outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Terminal snapshot
    pub progress: BatchBridgeProgress,
    pub termination: BatchTermination,
    /// Items never dispatched, in input order
    pub undispatched: Vec<TokenId>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl BatchReport {
    /// All dispatched items succeeded and nothing was left behind.
    pub fn is_success(&self) -> bool {
        self.termination.is_completed()
            && self.undispatched.is_empty()
            && self.progress.failed == 0
    }
}
