//! Chain Capabilities
//!
//! The orchestrator never talks to a blockchain directly. It drives three
//! capabilities implemented outside this workspace:
//!
//! - [`ChainClient`] - approval, bridge submission and confirmation on the source chain
//! - [`ForkSimulator`] - dry-run of an item against a forked destination-chain state
//! - [`WalletSession`] - signing identity and the currently active network
//!
//! All of them are object-safe so they can be shared as `Arc<dyn ...>` across
//! the worker tasks of a batch, and mocked in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{DestinationChain, NetworkId, TokenId, TxHash};

// ============================================================================
// Errors
// ============================================================================

/// Failure reported by a chain capability.
///
/// The executor maps these onto the per-item fault taxonomy; the capability
/// itself never decides what a failure means for the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The signer declined the request
    #[error("rejected: {0}")]
    Rejected(String),

    /// The transaction executed and reverted
    #[error("reverted: {0}")]
    Reverted(String),

    /// The capability gave up waiting
    #[error("timed out: {0}")]
    Timeout(String),

    /// The capability itself is gone (provider disconnected, RPC unreachable)
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl ChainError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn reverted(msg: impl Into<String>) -> Self {
        Self::Reverted(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the capability reported that it is no longer reachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ChainError::Unavailable(_))
    }
}

// ============================================================================
// Capability payloads
// ============================================================================

/// Receipt of a mined approval transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalReceipt {
    /// Approval transaction hash, when an on-chain approval was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    /// Block the approval was included in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl ApprovalReceipt {
    pub fn mined(hash: impl Into<TxHash>, block_number: u64) -> Self {
        Self {
            transaction_hash: Some(hash.into()),
            block_number: Some(block_number),
        }
    }

    /// Receipt for a token whose operator approval was already in place.
    pub fn pre_approved() -> Self {
        Self {
            transaction_hash: None,
            block_number: None,
        }
    }
}

/// Confirmation of a bridge transaction on the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub transaction_hash: TxHash,
    pub block_number: u64,
}

/// Output of a forked destination-chain simulation.
///
/// Only the fields the validation checks need are typed; everything else the
/// simulator produced is kept in `raw` as an opaque diagnostic blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationTrace {
    /// The simulated call reverted
    pub reverted: bool,
    /// Revert reason, if the simulator decoded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    /// The simulated return path reported overall success
    pub return_success: bool,
    /// Gas consumed by the simulated call
    pub gas_used: u64,
    /// Destination block the fork was taken at
    pub fork_block: u64,
    /// Destination chain head when the simulation ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_block: Option<u64>,
    /// Owner of the token on the destination chain after the simulated call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_owner: Option<String>,
    /// Raw simulator output
    #[serde(default)]
    pub raw: Value,
}

impl SimulationTrace {
    /// A clean, successful trace at the given fork block.
    pub fn success(fork_block: u64) -> Self {
        Self {
            return_success: true,
            fork_block,
            ..Default::default()
        }
    }

    /// A reverted trace with the given reason.
    pub fn revert(fork_block: u64, reason: impl Into<String>) -> Self {
        Self {
            reverted: true,
            revert_reason: Some(reason.into()),
            return_success: false,
            fork_block,
            ..Default::default()
        }
    }
}

// ============================================================================
// Capability traits
// ============================================================================

/// Source-chain transaction capability.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Whether the token still needs an operator approval before bridging.
    async fn approval_required(&self, _token_id: &TokenId) -> Result<bool, ChainError> {
        Ok(true)
    }

    /// Submit the approval transaction and wait for its receipt.
    async fn submit_approval(&self, token_id: &TokenId) -> Result<ApprovalReceipt, ChainError>;

    /// Submit the bridge transaction. Returns as soon as the hash is known.
    async fn submit_bridge(
        &self,
        token_id: &TokenId,
        destination: &DestinationChain,
    ) -> Result<TxHash, ChainError>;

    /// Wait for the bridge transaction to be confirmed.
    async fn await_confirmation(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, ChainError>;
}

/// Destination-chain fork simulation capability.
///
/// Implementations must not mutate real chain state.
#[async_trait]
pub trait ForkSimulator: Send + Sync {
    async fn forked_simulate(
        &self,
        token_id: &TokenId,
        destination: &DestinationChain,
    ) -> Result<SimulationTrace, ChainError>;
}

/// Wallet/session capability.
pub trait WalletSession: Send + Sync {
    /// Network the wallet is currently connected to.
    fn active_network(&self) -> NetworkId;

    /// Address of the signing account.
    fn signer(&self) -> String;
}
