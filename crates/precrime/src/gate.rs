//! PreCrime Validation Gate
//!
//! Simulates an item against a forked destination-chain state and turns the
//! resulting trace into a [`PreCrimeValidationResult`]. The trace is run
//! through three sequential check phases:
//! 1. VALIDITY - revert and recipient checks; a hard failure clears `isValid`
//! 2. OUTCOME - return status; a hard failure clears `success`
//! 3. ADVISORY - gas and snapshot staleness; failures become warnings
//!
//! The pipeline short-circuits after the first phase that fails in hard mode.
//! Any simulator problem fails closed with a negative verdict.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use batch_bridge_core::{
    BridgeItem, ChainError, DestinationChain, ForkSimulator, PreCrimeValidationResult,
    SimulationTrace,
};
use serde::{Deserialize, Serialize};

use crate::checks::{
    GasCeilingCheck, RecipientCheck, ReturnStatusCheck, RevertCheck, SimulationCheck,
    StaleSnapshotCheck,
};
use crate::models::{CheckMode, CheckPhase, PhaseReport, PipelineReport};

/// Prefix of the error carried by every fail-closed verdict.
pub const SIMULATION_UNAVAILABLE: &str = "simulation unavailable";

/// Whether a verdict was produced because the simulator could not be used.
pub fn is_simulation_unavailable(verdict: &PreCrimeValidationResult) -> bool {
    verdict
        .error
        .as_deref()
        .map_or(false, |e| e.starts_with(SIMULATION_UNAVAILABLE))
}

// ============================================================================
// Gate Config
// ============================================================================

/// Configuration of the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Simulation timeout used by [`PreCrimeGate::validate`]
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Per-phase mode overrides
    #[serde(default)]
    pub phase_modes: HashMap<CheckPhase, CheckMode>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            phase_modes: HashMap::new(),
        }
    }
}

impl GateConfig {
    /// Mode the given phase runs in.
    pub fn mode_for(&self, phase: CheckPhase) -> CheckMode {
        self.phase_modes
            .get(&phase)
            .copied()
            .unwrap_or_else(|| phase.default_mode())
    }

    pub fn set_phase_mode(&mut self, phase: CheckPhase, mode: CheckMode) {
        self.phase_modes.insert(phase, mode);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// PreCrimeGate
// ============================================================================

/// Simulation-backed validation gate.
///
/// Cheap to clone; clones share the simulator and the registered checks.
#[derive(Clone)]
pub struct PreCrimeGate {
    simulator: Arc<dyn ForkSimulator>,
    checks: Vec<Arc<dyn SimulationCheck>>,
    config: GateConfig,
}

impl std::fmt::Debug for PreCrimeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreCrimeGate")
            .field("checks", &self.check_ids())
            .field("config", &self.config)
            .finish()
    }
}

impl PreCrimeGate {
    /// Gate with the minimal check set: revert and return status.
    pub fn new(simulator: Arc<dyn ForkSimulator>) -> Self {
        Self {
            simulator,
            checks: vec![Arc::new(RevertCheck), Arc::new(ReturnStatusCheck)],
            config: GateConfig::default(),
        }
    }

    /// Gate with every built-in check at its default thresholds.
    pub fn standard(simulator: Arc<dyn ForkSimulator>) -> Self {
        Self::new(simulator)
            .with_check(Arc::new(RecipientCheck))
            .with_check(Arc::new(GasCeilingCheck::default()))
            .with_check(Arc::new(StaleSnapshotCheck::default()))
    }

    /// Register an additional check. Checks run in registration order within their phase.
    pub fn with_check(mut self, check: Arc<dyn SimulationCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn check_ids(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.id()).collect()
    }

    /// Run the check pipeline over a trace.
    pub fn evaluate(&self, trace: &SimulationTrace, destination: &DestinationChain) -> PipelineReport {
        let mut phase_results = Vec::with_capacity(CheckPhase::ALL.len());
        let mut short_circuit_phase = None;

        for phase in CheckPhase::ALL {
            let results = self
                .checks
                .iter()
                .filter(|c| c.phase() == phase)
                .map(|c| c.check(trace, destination))
                .collect();
            let report = PhaseReport::new(phase, self.config.mode_for(phase), results);
            let hard_fail = report.is_hard_fail();
            phase_results.push(report);

            if hard_fail {
                short_circuit_phase = Some(phase);
                break;
            }
        }

        PipelineReport {
            phase_results,
            short_circuit_phase,
        }
    }

    /// Validate an item using the configured timeout.
    pub async fn validate(
        &self,
        item: &BridgeItem,
        destination: &DestinationChain,
    ) -> PreCrimeValidationResult {
        self.validate_within(item, destination, self.config.timeout())
            .await
    }

    /// Validate an item, giving the simulator at most `timeout`.
    pub async fn validate_within(
        &self,
        item: &BridgeItem,
        destination: &DestinationChain,
        timeout: Duration,
    ) -> PreCrimeValidationResult {
        let token_id = item.token_id();
        let simulated = tokio::time::timeout(
            timeout,
            self.simulator.forked_simulate(token_id, destination),
        )
        .await;

        let trace = match simulated {
            Ok(Ok(trace)) => trace,
            Ok(Err(e)) => return fail_closed(item, &e),
            Err(_) => {
                return fail_closed(
                    item,
                    &ChainError::timeout(format!("no trace after {}ms", timeout.as_millis())),
                )
            }
        };

        let report = self.evaluate(&trace, destination);
        let verdict = verdict_from_report(&report, &trace);

        if verdict.passes() {
            tracing::debug!(
                token_id = %token_id,
                fork_block = trace.fork_block,
                warnings = verdict.warnings.len(),
                "[PreCrime] Verdict passed"
            );
        } else {
            tracing::warn!(
                token_id = %token_id,
                fork_block = trace.fork_block,
                is_valid = verdict.is_valid,
                success = verdict.success,
                error = verdict.error.as_deref().unwrap_or(""),
                "[PreCrime] Verdict failed"
            );
        }

        verdict
    }
}

fn fail_closed(item: &BridgeItem, cause: &ChainError) -> PreCrimeValidationResult {
    tracing::warn!(
        token_id = %item.token_id(),
        cause = %cause,
        "[PreCrime] Simulator unavailable, failing closed"
    );
    let mut verdict = PreCrimeValidationResult::invalid(format!("{}: {}", SIMULATION_UNAVAILABLE, cause));
    verdict.simulated_at = Some(chrono::Utc::now().to_rfc3339());
    verdict
}

fn verdict_from_report(report: &PipelineReport, trace: &SimulationTrace) -> PreCrimeValidationResult {
    let joined = |phase: &PhaseReport| phase.failure_messages().collect::<Vec<_>>().join("; ");

    let mut verdict = match report.short_circuit_phase.and_then(|p| report.phase(p)) {
        Some(phase) if phase.phase == CheckPhase::Validity => {
            PreCrimeValidationResult::invalid(joined(phase))
        }
        Some(phase) => PreCrimeValidationResult::unsuccessful(joined(phase)),
        None => PreCrimeValidationResult::pass(),
    };

    for phase in report.phase_results.iter().filter(|p| !p.is_hard_fail()) {
        verdict
            .warnings
            .extend(phase.failure_messages().map(str::to_string));
    }

    verdict.simulation_result = serde_json::to_value(trace).ok();
    verdict.simulated_block = Some(trace.fork_block);
    verdict.simulated_at = Some(chrono::Utc::now().to_rfc3339());
    verdict
}
