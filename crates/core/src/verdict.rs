//! PreCrime Verdict
//!
//! The verdict type lives in the core crate because it is stored on every
//! [`crate::item::BridgeItem`]; the gate that produces it lives in
//! `batch-bridge-precrime`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verdict of simulating an item's execution on the destination chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreCrimeValidationResult {
    /// The simulated call did not revert and obeys protocol invariants
    pub is_valid: bool,
    /// The simulated return path indicates overall success
    pub success: bool,
    /// Reason, populated when either flag is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal anomalies, in detection order
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Raw simulation output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_result: Option<Value>,
    /// Destination block the verdict was computed against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_block: Option<u64>,
    /// RFC 3339 timestamp of the simulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_at: Option<String>,
}

impl PreCrimeValidationResult {
    /// A passing verdict with no warnings.
    pub fn pass() -> Self {
        Self {
            is_valid: true,
            success: true,
            error: None,
            warnings: Vec::new(),
            simulation_result: None,
            simulated_block: None,
            simulated_at: None,
        }
    }

    /// A verdict where the simulated call was invalid (reverted or broke an invariant).
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            success: false,
            error: Some(error.into()),
            ..Self::pass()
        }
    }

    /// A verdict where the call was valid but flagged unsuccessful.
    pub fn unsuccessful(error: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            success: false,
            error: Some(error.into()),
            ..Self::pass()
        }
    }

    /// Add a warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Whether the verdict allows the item to enter `bridging`.
    pub fn passes(&self) -> bool {
        self.is_valid && self.success
    }
}
