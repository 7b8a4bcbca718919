//! Batch Bridge Core
//!
//! Foundational types for the Batch Bridge workspace. This crate has no
//! dependency on runtimes, chain clients or the orchestrator itself.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `types` - Opaque identifiers (`TokenId`, `TxHash`, `NetworkId`) and `BridgeRequest`
//! - `item` - `BridgeItem` lifecycle state machine
//! - `verdict` - `PreCrimeValidationResult`
//! - `fault` - Per-item fault taxonomy (`FaultKind`, `BridgeFault`)
//! - `capability` - Chain, simulation and wallet capability traits
//! - `builders` - `BatchOptions` and its builder
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror**
//! 2. **Trait-based capabilities** - enables mocking, testing, and swapping chain backends
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod builders;
pub mod capability;
pub mod error;
pub mod fault;
pub mod item;
pub mod types;
pub mod verdict;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Identifiers ────────────────────────────────────────────────────────
pub use types::{BridgeRequest, DestinationChain, NetworkId, TokenId, TxHash};

// ── Item Lifecycle ─────────────────────────────────────────────────────
pub use item::{BridgeItem, BridgeStatus};
pub use verdict::PreCrimeValidationResult;

// ── Fault Taxonomy ─────────────────────────────────────────────────────
pub use fault::{BridgeFault, FaultKind};

// ── Capabilities ───────────────────────────────────────────────────────
pub use capability::{
    ApprovalReceipt, ChainClient, ChainError, Confirmation, ForkSimulator, SimulationTrace,
    WalletSession,
};

// ── Options ────────────────────────────────────────────────────────────
pub use builders::{BatchOptions, BatchOptionsBuilder, MAX_CONCURRENCY, MAX_RETRIES};
