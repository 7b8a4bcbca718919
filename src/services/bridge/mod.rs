//! Batch Bridging
//!
//! - `executor` - drives one item through approval, validation and bridging
//! - `aggregator` - owns and publishes a batch's progress
//! - `orchestrator` - bounded-concurrency dispatch of a batch
//! - `service` - handle-based API over running batches

pub mod aggregator;
pub mod executor;
pub mod orchestrator;
pub mod service;

pub use aggregator::ProgressAggregator;
pub use executor::BridgeExecutor;
pub use orchestrator::{BatchOrchestrator, BatchRun};
pub use service::{BatchHandle, BridgeService};
