//! Batch Bridge
//!
//! Moves a batch of tokens to other chains, one bridge transaction per token,
//! after checking each one against a forked simulation of the destination
//! chain. It includes:
//! - Business logic services (executor, orchestrator, progress aggregator, service API)
//! - Storage layer (JSON config)
//! - Data models and utilities
//!
//! Chain access is supplied by the host through the capability traits
//! re-exported from `batch_bridge_core`.

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use batch_bridge_core::{
    ApprovalReceipt, BatchOptions, BatchOptionsBuilder, BridgeFault, BridgeItem, BridgeRequest,
    BridgeStatus, ChainClient, ChainError, Confirmation, CoreError, DestinationChain, FaultKind,
    ForkSimulator, NetworkId, PreCrimeValidationResult, SimulationTrace, TokenId, TxHash,
    WalletSession,
};
pub use batch_bridge_precrime::{GateConfig, PreCrimeGate, SimulationCheck};

pub use models::{BatchBridgeProgress, BatchReport, BatchTermination, BridgeResult, ProgressCallback};
pub use services::{BatchHandle, BatchOrchestrator, BridgeService, ProgressAggregator};
pub use storage::{BridgeConfig, BridgeConfigService};
pub use utils::error::{AppError, AppResult};
