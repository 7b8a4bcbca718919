//! PreCrime Check Models
//!
//! Data structures produced while running simulation checks.

use serde::{Deserialize, Serialize};

// ============================================================================
// Enums
// ============================================================================

/// Check phase. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPhase {
    /// Protocol validity: revert, invariant breaks. Decides `isValid`.
    Validity,
    /// Business outcome of the return path. Decides `success`.
    Outcome,
    /// Non-blocking anomalies. Produces `warnings`.
    Advisory,
}

impl CheckPhase {
    /// All phases in execution order.
    pub const ALL: [CheckPhase; 3] = [CheckPhase::Validity, CheckPhase::Outcome, CheckPhase::Advisory];

    /// Mode a phase runs in unless configured otherwise.
    pub fn default_mode(&self) -> CheckMode {
        match self {
            CheckPhase::Validity | CheckPhase::Outcome => CheckMode::Hard,
            CheckPhase::Advisory => CheckMode::Soft,
        }
    }
}

impl std::fmt::Display for CheckPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckPhase::Validity => write!(f, "validity"),
            CheckPhase::Outcome => write!(f, "outcome"),
            CheckPhase::Advisory => write!(f, "advisory"),
        }
    }
}

/// Check mode determining how failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Warning only - failures are reported but don't block the item
    Soft,
    /// Blocking - failures produce a negative verdict
    Hard,
}

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The trace did not carry the data this check needs
    Skipped,
}

// ============================================================================
// Check Result
// ============================================================================

/// Result of a single simulation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub check_id: String,
    pub phase: CheckPhase,
    pub passed: bool,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    pub fn passed(check_id: &str, phase: CheckPhase) -> Self {
        Self {
            check_id: check_id.to_string(),
            phase,
            passed: true,
            status: CheckStatus::Passed,
            message: "Check passed".to_string(),
        }
    }

    pub fn failed(check_id: &str, phase: CheckPhase, message: impl Into<String>) -> Self {
        Self {
            check_id: check_id.to_string(),
            phase,
            passed: false,
            status: CheckStatus::Failed,
            message: message.into(),
        }
    }

    pub fn skipped(check_id: &str, phase: CheckPhase, reason: &str) -> Self {
        Self {
            check_id: check_id.to_string(),
            phase,
            passed: true,
            status: CheckStatus::Skipped,
            message: reason.to_string(),
        }
    }
}

// ============================================================================
// Phase / Pipeline Reports
// ============================================================================

/// Result of all checks in one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub phase: CheckPhase,
    pub mode: CheckMode,
    pub passed: bool,
    pub results: Vec<CheckResult>,
}

impl PhaseReport {
    pub fn new(phase: CheckPhase, mode: CheckMode, results: Vec<CheckResult>) -> Self {
        let passed = results.iter().all(|r| r.passed);
        Self {
            phase,
            mode,
            passed,
            results,
        }
    }

    /// Whether this phase has a hard failure (failed + hard mode).
    pub fn is_hard_fail(&self) -> bool {
        !self.passed && self.mode == CheckMode::Hard
    }

    /// Messages of the failed checks, in registration order.
    pub fn failure_messages(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.message.as_str())
    }
}

/// Overall result of running the check pipeline over one trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Phase results in execution order
    pub phase_results: Vec<PhaseReport>,
    /// Which phase short-circuited the pipeline, if any
    pub short_circuit_phase: Option<CheckPhase>,
}

impl PipelineReport {
    pub fn phase(&self, phase: CheckPhase) -> Option<&PhaseReport> {
        self.phase_results.iter().find(|r| r.phase == phase)
    }

    /// A phase that did not run (short-circuited) counts as not passed.
    pub fn phase_passed(&self, phase: CheckPhase) -> bool {
        match self.phase(phase) {
            Some(report) => !report.is_hard_fail(),
            None => false,
        }
    }
}
