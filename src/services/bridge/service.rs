//! Bridge Service
//!
//! Handle-based entry point for callers: start a batch, watch or poll its
//! progress, cancel it, wait for its report, and re-run its failures.

use std::collections::HashMap;
use std::sync::Arc;

use batch_bridge_core::{
    BatchOptions, BridgeRequest, ChainClient, FaultKind, ForkSimulator, NetworkId, WalletSession,
};
use batch_bridge_precrime::PreCrimeGate;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::aggregator::ProgressAggregator;
use super::orchestrator::BatchOrchestrator;
use crate::models::{BatchBridgeProgress, BatchReport, ProgressCallback};
use crate::storage::BridgeConfig;
use crate::utils::error::{AppError, AppResult};

/// Opaque reference to a started batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchHandle {
    pub id: Uuid,
}

/// Bookkeeping for one started batch.
struct BatchEntry {
    requests: Vec<BridgeRequest>,
    aggregator: Arc<ProgressAggregator>,
    cancel: CancellationToken,
    report: watch::Receiver<Option<BatchReport>>,
}

/// Service managing bridge batches.
pub struct BridgeService {
    orchestrator: BatchOrchestrator,
    default_options: BatchOptions,
    batches: Arc<RwLock<HashMap<Uuid, BatchEntry>>>,
}

impl BridgeService {
    /// Create a service using the standard PreCrime check set.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        simulator: Arc<dyn ForkSimulator>,
        wallet: Arc<dyn WalletSession>,
    ) -> Self {
        Self {
            orchestrator: BatchOrchestrator::new(chain, wallet, PreCrimeGate::standard(simulator)),
            default_options: BatchOptions::default(),
            batches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a service whose source network and default options come from config.
    pub fn from_config(
        chain: Arc<dyn ChainClient>,
        simulator: Arc<dyn ForkSimulator>,
        wallet: Arc<dyn WalletSession>,
        config: &BridgeConfig,
    ) -> AppResult<Self> {
        config.validate().map_err(AppError::config)?;
        let mut service = Self::new(chain, simulator, wallet);
        service.default_options = config.default_options.clone();
        if let Some(network) = config.source_network() {
            service = service.with_source_network(network);
        }
        Ok(service)
    }

    /// Replace the validation gate.
    pub fn with_gate(mut self, gate: PreCrimeGate) -> Self {
        self.orchestrator = self.orchestrator.with_gate(gate);
        self
    }

    pub fn with_source_network(mut self, network: NetworkId) -> Self {
        self.orchestrator = self.orchestrator.with_source_network(network);
        self
    }

    pub fn default_options(&self) -> &BatchOptions {
        &self.default_options
    }

    /// Validate and start a batch in the background.
    pub async fn start_batch(
        &self,
        requests: Vec<BridgeRequest>,
        options: BatchOptions,
    ) -> AppResult<BatchHandle> {
        let run = self.orchestrator.prepare(requests.clone(), options)?;
        let handle = BatchHandle { id: run.batch_id() };
        let aggregator = run.aggregator();
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(None);

        // Register before spawning so the handle is usable immediately.
        self.batches.write().await.insert(
            handle.id,
            BatchEntry {
                requests,
                aggregator,
                cancel: cancel.clone(),
                report: rx,
            },
        );

        tokio::spawn(async move {
            let report = run.execute(cancel).await;
            let _ = tx.send(Some(report));
        });

        tracing::info!(batch_id = %handle.id, "[BridgeService] Batch started");
        Ok(handle)
    }

    /// Start a batch with the service's default options.
    pub async fn start_default_batch(&self, requests: Vec<BridgeRequest>) -> AppResult<BatchHandle> {
        self.start_batch(requests, self.default_options.clone()).await
    }

    /// Stop dispatching new items. In-flight items still finish.
    pub async fn cancel(&self, handle: &BatchHandle) -> AppResult<()> {
        let batches = self.batches.read().await;
        let entry = Self::entry(&batches, handle)?;
        entry.cancel.cancel();
        tracing::info!(batch_id = %handle.id, "[BridgeService] Batch cancellation requested");
        Ok(())
    }

    /// Register a progress observer. It receives the current snapshot immediately.
    pub async fn subscribe(&self, handle: &BatchHandle, on_update: ProgressCallback) -> AppResult<()> {
        let aggregator = {
            let batches = self.batches.read().await;
            Self::entry(&batches, handle)?.aggregator.clone()
        };
        aggregator.subscribe(on_update);
        Ok(())
    }

    pub async fn progress(&self, handle: &BatchHandle) -> AppResult<BatchBridgeProgress> {
        let batches = self.batches.read().await;
        Ok(Self::entry(&batches, handle)?.aggregator.snapshot())
    }

    /// Wait for the batch to finish. Can be called any number of times.
    pub async fn wait(&self, handle: &BatchHandle) -> AppResult<BatchReport> {
        let mut rx = {
            let batches = self.batches.read().await;
            Self::entry(&batches, handle)?.report.clone()
        };
        let report = rx
            .wait_for(|report| report.is_some())
            .await
            .map_err(|_| AppError::internal(format!("batch {} ended without a report", handle.id)))?;
        let report: Option<BatchReport> = (*report).clone();
        report.ok_or_else(|| AppError::internal(format!("batch {} has no report", handle.id)))
    }

    /// Start a new batch holding the failed items of a finished batch.
    ///
    /// Items whose confirmation timed out are left out: their transaction may
    /// still confirm.
    pub async fn retry_failed(
        &self,
        handle: &BatchHandle,
        options: BatchOptions,
    ) -> AppResult<BatchHandle> {
        let requests = {
            let batches = self.batches.read().await;
            let entry = Self::entry(&batches, handle)?;
            let finished: Option<BatchReport> = (*entry.report.borrow()).clone();
            let report = finished.ok_or_else(|| {
                AppError::validation(format!("batch {} is still running", handle.id))
            })?;

            let retryable: Vec<BridgeRequest> = report
                .progress
                .failures()
                .filter(|r| r.fault != Some(FaultKind::BridgeConfirmationTimeout))
                .filter_map(|r| {
                    entry
                        .requests
                        .iter()
                        .find(|req| req.token_id == r.token_id)
                        .cloned()
                })
                .collect();
            retryable
        };

        if requests.is_empty() {
            return Err(AppError::validation(format!(
                "batch {} has no failed items to retry",
                handle.id
            )));
        }

        tracing::info!(
            batch_id = %handle.id,
            items = requests.len(),
            "[BridgeService] Retrying failed items"
        );
        self.start_batch(requests, options).await
    }

    /// Forget a finished batch and return its final report.
    ///
    /// A running batch must be cancelled and waited for first. Afterwards the
    /// handle resolves to `NotFound`.
    pub async fn remove(&self, handle: &BatchHandle) -> AppResult<BatchReport> {
        let mut batches = self.batches.write().await;
        let finished: Option<BatchReport> = {
            let entry = Self::entry(&batches, handle)?;
            (*entry.report.borrow()).clone()
        };
        let report = finished.ok_or_else(|| {
            AppError::validation(format!("batch {} is still running", handle.id))
        })?;
        batches.remove(&handle.id);

        tracing::info!(batch_id = %handle.id, "[BridgeService] Batch removed");
        Ok(report)
    }

    /// Handles of every batch held by this service.
    pub async fn list_batches(&self) -> Vec<BatchHandle> {
        self.batches
            .read()
            .await
            .keys()
            .map(|id| BatchHandle { id: *id })
            .collect()
    }

    fn entry<'a>(
        batches: &'a HashMap<Uuid, BatchEntry>,
        handle: &BatchHandle,
    ) -> AppResult<&'a BatchEntry> {
        batches
            .get(&handle.id)
            .ok_or_else(|| AppError::not_found(format!("batch {}", handle.id)))
    }
}
