//! Cancellation Integration Tests
//!
//! Cancellation stops dispatch of new items while in-flight items run to a
//! terminal status. Undispatched items never appear in results.

use std::sync::Arc;
use std::time::Duration;

use batch_bridge::{
    BatchOptions, BatchOptionsBuilder, BatchOrchestrator, BatchTermination, BridgeService,
    FaultKind, NetworkId, PreCrimeGate,
};
use tokio_util::sync::CancellationToken;

use crate::support::{
    requests, token, Recorder, ScriptedChain, ScriptedSimulator, ScriptedWallet, SOURCE_NETWORK,
};

fn orchestrator(chain: &Arc<ScriptedChain>) -> BatchOrchestrator {
    BatchOrchestrator::new(
        chain.clone(),
        ScriptedWallet::on(SOURCE_NETWORK),
        PreCrimeGate::standard(ScriptedSimulator::new()),
    )
    .with_source_network(NetworkId(SOURCE_NETWORK))
}

#[tokio::test]
async fn test_cancel_after_first_terminal_item() {
    let chain = ScriptedChain::new();
    for id in 1..=5 {
        chain.delay_bridge(id, Duration::from_millis(30));
    }

    let run = orchestrator(&chain)
        .prepare(requests(&[1, 2, 3, 4, 5]), BatchOptions::default())
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    run.aggregator().subscribe(Arc::new(move |progress| {
        if progress.completed + progress.failed >= 1 {
            trigger.cancel();
        }
    }));
    let recorder = Recorder::new();
    run.aggregator().subscribe(recorder.callback());

    let report = run.execute(cancel).await;

    assert_eq!(report.termination, BatchTermination::Cancelled);
    assert_eq!(report.progress.total, 5);
    assert_eq!(report.progress.results.len(), 1);
    assert_eq!(report.progress.results[0].token_id, token(1));
    assert_eq!(
        report.undispatched,
        vec![token(2), token(3), token(4), token(5)]
    );
    assert!(!report.progress.is_finished());
    recorder.assert_invariants(1);
}

#[tokio::test]
async fn test_in_flight_items_finish_after_cancel() {
    let chain = ScriptedChain::new();
    for id in 1..=4 {
        chain.delay_bridge(id, Duration::from_millis(100));
    }

    let options = BatchOptionsBuilder::new().concurrency(2).build().unwrap();
    let run = orchestrator(&chain)
        .prepare(requests(&[1, 2, 3, 4]), options)
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    run.aggregator().subscribe(Arc::new(move |progress| {
        if progress.in_flight == 2 {
            trigger.cancel();
        }
    }));

    let report = run.execute(cancel).await;

    assert_eq!(report.termination, BatchTermination::Cancelled);
    assert_eq!(report.progress.completed, 2);
    assert!(report.progress.results.iter().all(|r| r.success));
    assert_eq!(report.undispatched, vec![token(3), token(4)]);
    assert_eq!(chain.submissions().len(), 2);
}

#[tokio::test]
async fn test_retry_skipped_by_cancel_is_recorded_as_cancelled() {
    let chain = ScriptedChain::new();
    chain.fail_approval_times(1, 1);

    let options = BatchOptionsBuilder::new()
        .retry_failed_on_submit(true)
        .max_retries(2)
        .build()
        .unwrap();
    let run = orchestrator(&chain)
        .prepare(requests(&[1, 2]), options)
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    run.aggregator().subscribe(Arc::new(move |progress| {
        if progress.in_flight == 1 {
            trigger.cancel();
        }
    }));

    let report = run.execute(cancel).await;

    assert_eq!(report.termination, BatchTermination::Cancelled);
    assert_eq!(report.progress.failed, 1);
    let skipped = report.progress.result_for(&token(1)).unwrap();
    assert_eq!(skipped.fault, Some(FaultKind::BatchCancelled));
    assert!(skipped
        .error
        .as_deref()
        .unwrap()
        .starts_with("retry skipped after approval-failed"));
    assert_eq!(report.undispatched, vec![token(2)]);
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_cancel_through_service() {
    let chain = ScriptedChain::new();
    for id in 1..=4 {
        chain.delay_bridge(id, Duration::from_millis(150));
    }
    let service = BridgeService::new(
        chain.clone(),
        ScriptedSimulator::new(),
        ScriptedWallet::on(SOURCE_NETWORK),
    );

    let handle = service
        .start_batch(requests(&[1, 2, 3, 4]), BatchOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.cancel(&handle).await.unwrap();

    let report = service.wait(&handle).await.unwrap();
    assert_eq!(report.termination, BatchTermination::Cancelled);
    assert_eq!(report.progress.total, 4);
    assert!(!report.undispatched.is_empty());
    assert_eq!(
        report.progress.results.len() + report.undispatched.len(),
        4
    );
    for id in &report.undispatched {
        assert!(report.progress.result_for(id).is_none());
    }
}
