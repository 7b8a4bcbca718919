//! Batch Progress Models
//!
//! `BatchBridgeProgress` is the observable state of one batch. Callers only
//! ever see owned snapshots of it; the single live copy is held by the
//! progress aggregator.

use std::sync::Arc;

use batch_bridge_core::{BridgeItem, FaultKind, PreCrimeValidationResult, TokenId, TxHash};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Observer invoked with an owned snapshot after every progress mutation.
pub type ProgressCallback = Arc<dyn Fn(BatchBridgeProgress) + Send + Sync>;

/// Terminal outcome of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResult {
    pub token_id: TokenId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_crime_result: Option<PreCrimeValidationResult>,
}

impl BridgeResult {
    /// Build a result from an item that reached a terminal status.
    pub fn from_item(item: &BridgeItem) -> Self {
        Self {
            token_id: item.token_id().clone(),
            success: item.status() == batch_bridge_core::BridgeStatus::Success,
            transaction_hash: item.transaction_hash().cloned(),
            error: item.error().map(str::to_string),
            fault: item.fault(),
            pre_crime_result: item.pre_crime_result().cloned(),
        }
    }
}

/// Progress of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBridgeProgress {
    pub batch_id: Uuid,
    /// Number of items submitted; fixed for the life of the batch
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// The in-flight item most recently transitioned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<BridgeItem>,
    /// Number of items currently approving or bridging
    pub in_flight: usize,
    /// Terminal results in the order items reached them
    pub results: Vec<BridgeResult>,
}

impl BatchBridgeProgress {
    pub fn new(batch_id: Uuid, total: usize) -> Self {
        Self {
            batch_id,
            total,
            completed: 0,
            failed: 0,
            current: None,
            in_flight: 0,
            results: Vec::new(),
        }
    }

    /// Number of items that reached a terminal status.
    pub fn terminal(&self) -> usize {
        self.completed + self.failed
    }

    /// Every submitted item reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.terminal() == self.total
    }

    pub fn result_for(&self, token_id: &TokenId) -> Option<&BridgeResult> {
        self.results.iter().find(|r| &r.token_id == token_id)
    }

    /// Results that failed, in terminal order.
    pub fn failures(&self) -> impl Iterator<Item = &BridgeResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
