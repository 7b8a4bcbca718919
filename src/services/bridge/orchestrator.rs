//! Batch Orchestrator
//!
//! Dispatches the items of a batch in input order under a bounded number of
//! concurrent workers. Each worker drives one item through the executor,
//! applies its terminal transition and reports to the progress aggregator.
//!
//! Dispatch stops when the batch is cancelled or when an item raises a
//! batch-fatal fault; items already in flight always run to a terminal status.
//! A retry that would start after dispatch stopped is recorded as
//! `batch-cancelled`, and an item whose worker dies is recorded as failed.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use batch_bridge_core::{
    BatchOptions, BridgeFault, BridgeItem, BridgeRequest, ChainClient, NetworkId, TokenId,
    WalletSession,
};
use batch_bridge_precrime::PreCrimeGate;
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::aggregator::ProgressAggregator;
use super::executor::BridgeExecutor;
use crate::models::{BatchReport, BatchTermination, ProgressCallback};
use crate::utils::error::{AppError, AppResult};

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs batches of bridge requests.
#[derive(Clone)]
pub struct BatchOrchestrator {
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn WalletSession>,
    gate: PreCrimeGate,
    source_network: Option<NetworkId>,
}

impl BatchOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn WalletSession>,
        gate: PreCrimeGate,
    ) -> Self {
        Self {
            chain,
            wallet,
            gate,
            source_network: None,
        }
    }

    /// Pin the network the wallet must stay on. Without it, the network
    /// active when the batch is prepared is used.
    pub fn with_source_network(mut self, network: NetworkId) -> Self {
        self.source_network = Some(network);
        self
    }

    pub fn with_gate(mut self, gate: PreCrimeGate) -> Self {
        self.gate = gate;
        self
    }

    /// Run a batch to completion, reporting progress to `on_update`.
    pub async fn run_batch(
        &self,
        requests: Vec<BridgeRequest>,
        options: BatchOptions,
        on_update: ProgressCallback,
    ) -> AppResult<BatchReport> {
        let run = self.prepare(requests, options)?;
        run.aggregator().subscribe(on_update);
        Ok(run.execute(CancellationToken::new()).await)
    }

    /// Validate a batch and set up its executor and aggregator without starting it.
    pub fn prepare(&self, requests: Vec<BridgeRequest>, options: BatchOptions) -> AppResult<BatchRun> {
        options.validate()?;

        let mut seen = HashSet::with_capacity(requests.len());
        for request in &requests {
            if !seen.insert(&request.token_id) {
                return Err(AppError::validation(format!(
                    "duplicate token id in batch: {}",
                    request.token_id
                )));
            }
        }

        let batch_id = Uuid::new_v4();
        let expected_network = self
            .source_network
            .unwrap_or_else(|| self.wallet.active_network());

        let executor = BridgeExecutor::new(
            self.chain.clone(),
            self.wallet.clone(),
            self.gate.clone(),
            expected_network,
        )
        .with_timeout(options.per_item_timeout())
        .with_fail_fast_on_network_mismatch(options.fail_fast_on_network_mismatch);

        let aggregator = Arc::new(ProgressAggregator::new(
            batch_id,
            requests.iter().map(|r| r.token_id.clone()),
        ));

        let items = requests
            .into_iter()
            .map(|r| BridgeItem::new(r.token_id, r.destination))
            .collect();

        tracing::info!(
            batch_id = %batch_id,
            network = %expected_network,
            signer = %self.wallet.signer(),
            "[BatchOrchestrator] Batch prepared"
        );

        Ok(BatchRun {
            batch_id,
            items,
            options,
            executor: Arc::new(executor),
            aggregator,
        })
    }
}

// ============================================================================
// Batch Run
// ============================================================================

/// A prepared batch, ready to execute.
pub struct BatchRun {
    batch_id: Uuid,
    items: Vec<BridgeItem>,
    options: BatchOptions,
    executor: Arc<BridgeExecutor>,
    aggregator: Arc<ProgressAggregator>,
}

/// State shared by the workers of one run.
struct RunContext {
    batch_id: Uuid,
    options: BatchOptions,
    executor: Arc<BridgeExecutor>,
    aggregator: Arc<ProgressAggregator>,
    /// Cancelled on caller cancellation or on the first fatal fault
    stop: CancellationToken,
    fatal: Mutex<Option<BridgeFault>>,
}

impl RunContext {
    fn record_fatal(&self, fault: &BridgeFault) {
        let mut fatal = self.fatal.lock().unwrap_or_else(|p| p.into_inner());
        if fatal.is_none() {
            tracing::error!(
                batch_id = %self.batch_id,
                fault = %fault,
                "[BatchOrchestrator] Batch-fatal fault, stopping dispatch"
            );
            *fatal = Some(fault.clone());
        }
        self.stop.cancel();
    }

    fn take_fatal(&self) -> Option<BridgeFault> {
        self.fatal.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

impl BatchRun {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn aggregator(&self) -> Arc<ProgressAggregator> {
        self.aggregator.clone()
    }

    /// Execute the batch. `cancel` stops dispatch of items not yet started.
    pub async fn execute(self, cancel: CancellationToken) -> BatchReport {
        let started = Instant::now();
        let BatchRun {
            batch_id,
            items,
            options,
            executor,
            aggregator,
        } = self;

        let ctx = Arc::new(RunContext {
            batch_id,
            options: options.clone(),
            executor,
            aggregator: aggregator.clone(),
            stop: cancel.child_token(),
            fatal: Mutex::new(None),
        });

        tracing::info!(
            batch_id = %batch_id,
            total = items.len(),
            concurrency = options.concurrency,
            "[BatchOrchestrator] Batch started"
        );

        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        let mut workers = JoinSet::new();
        let mut dispatched: Vec<BridgeItem> = Vec::new();
        let mut undispatched: Vec<TokenId> = Vec::new();
        let mut pending = items.into_iter();

        for item in pending.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = ctx.stop.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit.filter(|_| !ctx.stop.is_cancelled()) else {
                undispatched.push(item.token_id().clone());
                break;
            };

            dispatched.push(item.clone());
            let ctx = ctx.clone();
            workers.spawn(async move {
                let _permit = permit;
                drive_item(&ctx, item).await;
            });
        }
        undispatched.extend(pending.map(|item| item.token_id().clone()));

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(batch_id = %batch_id, error = %e, "[BatchOrchestrator] Worker task failed");
            }
        }
        // Every dispatched item ends terminal, even if its worker died.
        fail_abandoned(&ctx, dispatched);

        let termination = match ctx.take_fatal() {
            Some(fault) => BatchTermination::Aborted { fault },
            None if cancel.is_cancelled() => BatchTermination::Cancelled,
            None => BatchTermination::Completed,
        };

        let progress = aggregator.snapshot();
        aggregator.close();
        tracing::info!(
            batch_id = %batch_id,
            completed = progress.completed,
            failed = progress.failed,
            undispatched = undispatched.len(),
            termination = ?termination,
            "[BatchOrchestrator] Batch finished"
        );

        BatchReport {
            progress,
            termination,
            undispatched,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Drive one item to a terminal status, re-dispatching it in place while it
/// fails with a retryable fault and attempts remain.
async fn drive_item(ctx: &RunContext, mut item: BridgeItem) {
    let aggregator = ctx.aggregator.clone();
    let on_transition = move |i: &BridgeItem| {
        aggregator.apply_transition(i);
    };

    loop {
        let outcome = AssertUnwindSafe(ctx.executor.execute(&mut item, &on_transition))
            .catch_unwind()
            .await;

        let (fault, panicked) = match outcome {
            Ok(Ok(hash)) => match item.succeed() {
                Ok(()) => {
                    tracing::info!(
                        batch_id = %ctx.batch_id,
                        token_id = %item.token_id(),
                        tx_hash = %hash,
                        attempts = item.attempts(),
                        "[BatchOrchestrator] Item bridged"
                    );
                    ctx.aggregator.apply_transition(&item);
                    return;
                }
                Err(e) => (BridgeFault::confirmation_timeout(e.to_string()), false),
            },
            Ok(Err(fault)) => (fault, false),
            Err(panic) => (panic_fault(&item, panic.as_ref()), true),
        };

        if fault.fatal {
            ctx.record_fatal(&fault);
        }

        let eligible = !panicked
            && ctx.options.retry_failed_on_submit
            && fault.is_retryable()
            && item.transaction_hash().is_none()
            && item.attempts() < ctx.options.max_attempts();
        let stopping = ctx.stop.is_cancelled();
        let fault = if eligible && stopping {
            BridgeFault::batch_cancelled(format!("retry skipped after {}", fault))
        } else {
            fault
        };

        if let Err(e) = item.fail(&fault) {
            tracing::error!(
                batch_id = %ctx.batch_id,
                token_id = %item.token_id(),
                error = %e,
                "[BatchOrchestrator] Could not mark item failed"
            );
            return;
        }

        if eligible && !stopping && item.retry().is_ok() {
            tracing::warn!(
                batch_id = %ctx.batch_id,
                token_id = %item.token_id(),
                fault = %fault,
                attempt = item.attempts(),
                "[BatchOrchestrator] Retrying item"
            );
            ctx.aggregator.apply_transition(&item);
            continue;
        }

        tracing::warn!(
            batch_id = %ctx.batch_id,
            token_id = %item.token_id(),
            fault = %fault,
            "[BatchOrchestrator] Item failed"
        );
        ctx.aggregator.apply_transition(&item);
        return;
    }
}

/// Record a failure for every dispatched item whose worker ended without a
/// terminal transition.
fn fail_abandoned(ctx: &RunContext, dispatched: Vec<BridgeItem>) {
    for fallback in dispatched {
        if ctx.aggregator.is_recorded(fallback.token_id()) {
            continue;
        }
        let mut item = ctx
            .aggregator
            .in_flight_item(fallback.token_id())
            .unwrap_or(fallback);
        let fault = lost_fault(&item, "worker task ended before the item finished".to_string());
        match item.fail(&fault) {
            Ok(()) => {
                tracing::error!(
                    batch_id = %ctx.batch_id,
                    token_id = %item.token_id(),
                    fault = %fault,
                    "[BatchOrchestrator] Item abandoned by its worker"
                );
                ctx.aggregator.apply_transition(&item);
            }
            Err(e) => tracing::error!(
                batch_id = %ctx.batch_id,
                token_id = %item.token_id(),
                error = %e,
                "[BatchOrchestrator] Could not mark abandoned item failed"
            ),
        }
    }
}

fn panic_fault(item: &BridgeItem, panic: &(dyn std::any::Any + Send)) -> BridgeFault {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    lost_fault(item, format!("item task panicked: {}", detail))
}

/// Items carrying a transaction hash get a non-retryable fault.
fn lost_fault(item: &BridgeItem, message: String) -> BridgeFault {
    if item.transaction_hash().is_some() {
        BridgeFault::confirmation_timeout(message)
    } else {
        BridgeFault::bridge_submission_failed(message)
    }
}
