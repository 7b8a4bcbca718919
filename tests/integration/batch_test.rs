//! Batch Orchestration Integration Tests
//!
//! Runs whole batches through the orchestrator against scripted chain
//! capabilities and checks outcomes, ordering and progress invariants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use batch_bridge::services::ProgressAggregator;
use batch_bridge::{
    BatchOptions, BatchOptionsBuilder, BatchOrchestrator, BatchTermination, BridgeItem, FaultKind,
    NetworkId, PreCrimeGate, TokenId,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::support::{
    destination, requests, token, Recorder, ScriptedChain, ScriptedSimulator, ScriptedWallet,
    SOURCE_NETWORK,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn orchestrator(
    chain: &Arc<ScriptedChain>,
    simulator: &Arc<ScriptedSimulator>,
    wallet: &Arc<ScriptedWallet>,
) -> BatchOrchestrator {
    BatchOrchestrator::new(
        chain.clone(),
        wallet.clone(),
        PreCrimeGate::standard(simulator.clone()),
    )
    .with_source_network(NetworkId(SOURCE_NETWORK))
}

fn ids(tokens: &[TokenId]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_negative_verdict_fails_only_that_item() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    simulator.revert(2, "transfer blocked");

    let recorder = Recorder::new();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3]), BatchOptions::default(), recorder.callback())
        .await
        .unwrap();

    let progress = &report.progress;
    assert_eq!(report.termination, BatchTermination::Completed);
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.failed, 1);

    let order: Vec<TokenId> = progress.results.iter().map(|r| r.token_id.clone()).collect();
    assert_eq!(ids(&order), vec!["1", "2", "3"]);

    assert!(progress.results[0].success);
    assert!(progress.results[0].transaction_hash.is_some());

    let failed = &progress.results[1];
    assert!(!failed.success);
    assert!(failed.transaction_hash.is_none());
    assert_eq!(failed.error.as_deref(), Some("revert: transfer blocked"));
    assert_eq!(failed.fault, Some(FaultKind::ValidationFailed));
    let verdict = failed.pre_crime_result.as_ref().unwrap();
    assert!(!verdict.is_valid);
    assert_eq!(verdict.simulated_block, Some(500));

    assert!(progress.results[2].success);
    assert_eq!(ids(&chain.submissions()), vec!["1", "3"]);

    recorder.assert_invariants(1);
}

#[tokio::test]
async fn test_unreachable_simulator_fails_every_item_closed() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    simulator.set_unavailable(true);

    let recorder = Recorder::new();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3]), BatchOptions::default(), recorder.callback())
        .await
        .unwrap();

    assert_eq!(report.termination, BatchTermination::Completed);
    assert_eq!(report.progress.failed, 3);
    for result in &report.progress.results {
        assert!(result.error.as_deref().unwrap().contains("simulation unavailable"));
        assert_eq!(result.fault, Some(FaultKind::SimulationUnavailable));
    }
    assert!(chain.submissions().is_empty());
    for snapshot in recorder.snapshots() {
        if let Some(current) = snapshot.current {
            assert_ne!(current.status(), batch_bridge::BridgeStatus::Bridging);
        }
    }
    recorder.assert_invariants(1);
}

#[tokio::test]
async fn test_concurrent_results_follow_completion_order() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.delay_confirmation(1, Duration::from_millis(20));
    chain.delay_confirmation(2, Duration::from_millis(400));
    chain.delay_confirmation(3, Duration::from_millis(20));
    chain.delay_confirmation(4, Duration::from_millis(20));

    let options = BatchOptionsBuilder::new().concurrency(2).build().unwrap();
    let recorder = Recorder::new();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3, 4]), options, recorder.callback())
        .await
        .unwrap();

    let progress = &report.progress;
    assert_eq!(progress.total, 4);
    assert_eq!(progress.completed, 4);
    assert_eq!(progress.results.last().unwrap().token_id, token(2));
    assert_eq!(chain.submissions().len(), 4);
    assert!(recorder.snapshots().iter().any(|s| s.in_flight == 2));
    recorder.assert_invariants(2);
}

#[tokio::test]
async fn test_sequential_submission_follows_input_order() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.delay_bridge(1, Duration::from_millis(60));
    chain.delay_bridge(3, Duration::from_millis(30));

    let recorder = Recorder::new();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3, 4, 5]), BatchOptions::default(), recorder.callback())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(ids(&chain.submissions()), vec!["1", "2", "3", "4", "5"]);
    recorder.assert_invariants(1);
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_retry_on_submit_recovers_transient_approval_failure() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.fail_approval_times(2, 1);

    let options = BatchOptionsBuilder::new()
        .retry_failed_on_submit(true)
        .max_retries(1)
        .build()
        .unwrap();
    let recorder = Recorder::new();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3]), options, recorder.callback())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.progress.results.len(), 3);
    assert_eq!(chain.submission_count(2), 1);
    recorder.assert_invariants(1);
}

#[tokio::test]
async fn test_without_retry_transient_failure_is_final() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.fail_approval_times(2, 1);

    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3]), BatchOptions::default(), Recorder::new().callback())
        .await
        .unwrap();

    let failed = report.progress.result_for(&token(2)).unwrap();
    assert_eq!(failed.fault, Some(FaultKind::ApprovalFailed));
    assert_eq!(report.progress.completed, 2);
}

#[tokio::test]
async fn test_retry_is_bounded_by_max_retries() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.fail_approval_times(1, 5);

    let options = BatchOptionsBuilder::new()
        .retry_failed_on_submit(true)
        .max_retries(2)
        .build()
        .unwrap();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1]), options, Recorder::new().callback())
        .await
        .unwrap();

    assert_eq!(report.progress.failed, 1);
    assert_eq!(report.progress.results[0].fault, Some(FaultKind::ApprovalFailed));
}

#[tokio::test]
async fn test_retry_never_rebridges_timed_out_confirmation() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.hang_confirmation(2);

    let options = BatchOptionsBuilder::new()
        .retry_failed_on_submit(true)
        .max_retries(3)
        .per_item_timeout_ms(100)
        .build()
        .unwrap();
    let recorder = Recorder::new();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3]), options, recorder.callback())
        .await
        .unwrap();

    let timed_out = report.progress.result_for(&token(2)).unwrap();
    assert_eq!(timed_out.fault, Some(FaultKind::BridgeConfirmationTimeout));
    assert!(timed_out.transaction_hash.is_some());
    assert_eq!(chain.submission_count(2), 1);
    assert_eq!(report.progress.completed, 2);
    recorder.assert_invariants(1);
}

#[tokio::test]
async fn test_rejected_approval_is_not_retried() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.reject_approval(1);

    let options = BatchOptionsBuilder::new()
        .retry_failed_on_submit(true)
        .build()
        .unwrap();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2]), options, Recorder::new().callback())
        .await
        .unwrap();

    let rejected = report.progress.result_for(&token(1)).unwrap();
    assert_eq!(rejected.fault, Some(FaultKind::ApprovalRejected));
    assert_eq!(report.progress.completed, 1);
}

// ============================================================================
// Batch-fatal faults
// ============================================================================

#[tokio::test]
async fn test_network_switch_aborts_batch() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.switch_wallet_after_bridge(1, wallet.clone(), 137);

    let recorder = Recorder::new();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3]), BatchOptions::default(), recorder.callback())
        .await
        .unwrap();

    match &report.termination {
        BatchTermination::Aborted { fault } => {
            assert_eq!(fault.kind, FaultKind::NetworkMismatch);
            assert!(fault.fatal);
        }
        other => panic!("expected abort, got {:?}", other),
    }
    assert!(report.progress.result_for(&token(1)).unwrap().success);
    assert_eq!(
        report.progress.result_for(&token(2)).unwrap().fault,
        Some(FaultKind::NetworkMismatch)
    );
    assert_eq!(report.undispatched, vec![token(3)]);
    assert!(!report.progress.is_finished());
    recorder.assert_invariants(1);
}

#[tokio::test]
async fn test_network_switch_without_fail_fast_fails_each_item() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.switch_wallet_after_bridge(1, wallet.clone(), 137);

    let options = BatchOptionsBuilder::new()
        .fail_fast_on_network_mismatch(false)
        .build()
        .unwrap();
    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3]), options, Recorder::new().callback())
        .await
        .unwrap();

    assert_eq!(report.termination, BatchTermination::Completed);
    assert_eq!(report.progress.completed, 1);
    assert_eq!(report.progress.failed, 2);
    assert!(report.undispatched.is_empty());
}

#[tokio::test]
async fn test_lost_provider_aborts_batch() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.lose_provider_on_bridge(2);

    let report = orchestrator(&chain, &simulator, &wallet)
        .run_batch(requests(&[1, 2, 3, 4]), BatchOptions::default(), Recorder::new().callback())
        .await
        .unwrap();

    assert!(matches!(report.termination, BatchTermination::Aborted { .. }));
    assert_eq!(report.progress.completed, 1);
    assert_eq!(
        report.progress.result_for(&token(2)).unwrap().fault,
        Some(FaultKind::BridgeSubmissionFailed)
    );
    assert_eq!(report.undispatched, vec![token(3), token(4)]);
}

#[tokio::test]
async fn test_item_is_recorded_when_its_worker_dies() {
    let chain = ScriptedChain::new();
    let simulator = ScriptedSimulator::new();
    let wallet = ScriptedWallet::on(SOURCE_NETWORK);
    chain.fail_approval_times(1, 1);

    let options = BatchOptionsBuilder::new()
        .retry_failed_on_submit(true)
        .max_retries(1)
        .build()
        .unwrap();
    let run = orchestrator(&chain, &simulator, &wallet)
        .prepare(requests(&[1, 2]), options)
        .unwrap();
    let aggregator = run.aggregator();

    // Panics on the snapshot published when item 1 is put back to pending,
    // which happens in the worker outside the per-attempt panic guard.
    let seen_in_flight = Arc::new(AtomicBool::new(false));
    let tripped = Arc::new(AtomicBool::new(false));
    aggregator.subscribe(Arc::new(move |progress| {
        if progress.in_flight > 0 {
            seen_in_flight.store(true, Ordering::SeqCst);
        } else if seen_in_flight.load(Ordering::SeqCst)
            && progress.terminal() == 0
            && !tripped.swap(true, Ordering::SeqCst)
        {
            panic!("observer failed");
        }
    }));
    let recorder = Recorder::new();
    aggregator.subscribe(recorder.callback());

    let report = run.execute(CancellationToken::new()).await;

    assert_eq!(report.progress.total, 2);
    assert_eq!(report.progress.completed, 1);
    assert_eq!(report.progress.failed, 1);
    assert!(report.undispatched.is_empty());
    assert!(report.progress.is_finished());

    let lost = report.progress.result_for(&token(1)).unwrap();
    assert!(!lost.success);
    assert!(lost.transaction_hash.is_none());
    assert_eq!(lost.fault, Some(FaultKind::BridgeSubmissionFailed));
    assert!(lost.error.as_deref().unwrap().contains("worker task ended"));
    assert!(report.progress.result_for(&token(2)).unwrap().success);
    assert_eq!(chain.submission_count(1), 0);

    assert_eq!(aggregator.observer_count(), 0);
    recorder.assert_invariants(1);
}

// ============================================================================
// Aggregator
// ============================================================================

#[test]
fn test_late_duplicate_terminal_event_is_not_double_counted() {
    let aggregator = ProgressAggregator::new(Uuid::new_v4(), vec![token(1), token(2)]);
    let recorder = Recorder::new();
    aggregator.subscribe(recorder.callback());

    let mut item = BridgeItem::new(1u64, destination());
    item.begin_approval().unwrap();
    aggregator.apply_transition(&item);
    item.fail(&batch_bridge::BridgeFault::approval_rejected("declined")).unwrap();

    assert!(aggregator.apply_transition(&item));
    assert!(!aggregator.apply_transition(&item));

    let progress = aggregator.snapshot();
    assert_eq!(progress.failed, 1);
    assert_eq!(progress.results.len(), 1);
    assert_eq!(recorder.snapshots().len(), 3);
    recorder.assert_invariants(1);
}
