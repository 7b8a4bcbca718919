//! Batch Bridge PreCrime
//!
//! Simulation-backed validation of bridge items before any irreversible
//! transaction is sent:
//!
//! - `models` - Check pipeline data types (CheckPhase, CheckMode, CheckResult, reports)
//! - `checks` - `SimulationCheck` trait and the built-in checks
//! - `gate` - `PreCrimeGate`, which runs the simulator and the check pipeline
//!
//! The verdict type itself, `PreCrimeValidationResult`, lives in
//! `batch-bridge-core` because every `BridgeItem` stores one.

pub mod checks;
pub mod gate;
pub mod models;

// Re-export model types
pub use models::{CheckMode, CheckPhase, CheckResult, CheckStatus, PhaseReport, PipelineReport};

// Re-export checks
pub use checks::{
    GasCeilingCheck, RecipientCheck, ReturnStatusCheck, RevertCheck, SimulationCheck,
    StaleSnapshotCheck, DEFAULT_GAS_CEILING, DEFAULT_MAX_SNAPSHOT_AGE_BLOCKS,
};

// Re-export gate
pub use gate::{is_simulation_unavailable, GateConfig, PreCrimeGate, SIMULATION_UNAVAILABLE};

// Convenience re-export so callers only need one import for the verdict
pub use batch_bridge_core::PreCrimeValidationResult;
