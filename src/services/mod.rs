//! Services
//!
//! Business logic for running bridge batches.

pub mod bridge;

pub use bridge::{
    BatchHandle, BatchOrchestrator, BatchRun, BridgeExecutor, BridgeService, ProgressAggregator,
};
