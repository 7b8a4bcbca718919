//! Bridge Executor
//!
//! Drives one item through network guard, approval, PreCrime validation,
//! bridge submission and confirmation. Every failure comes back as a
//! classified [`BridgeFault`]; the executor never retries and never applies a
//! terminal transition itself.
//!
//! Timeouts are classified by the step that stalled. An approval timeout is
//! `approval-failed` (retryable, nothing has been bridged yet), not
//! `bridge-confirmation-timeout`, which is kept for steps after which the
//! bridge transaction may already be on chain.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use batch_bridge_core::{
    ApprovalReceipt, BridgeFault, BridgeItem, ChainClient, ChainError, CoreError, NetworkId,
    TxHash, WalletSession,
};
use batch_bridge_precrime::{is_simulation_unavailable, PreCrimeGate};

/// Outcome of one awaited chain operation under a timeout.
enum Step<T> {
    Done(T),
    Failed(ChainError),
    TimedOut,
}

async fn bounded<T, F>(timeout: Duration, fut: F) -> Step<T>
where
    F: Future<Output = Result<T, ChainError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Step::Done(value),
        Ok(Err(e)) => Step::Failed(e),
        Err(_) => Step::TimedOut,
    }
}

/// Executes single bridge items against the chain capabilities.
pub struct BridgeExecutor {
    chain: Arc<dyn ChainClient>,
    wallet: Arc<dyn WalletSession>,
    gate: PreCrimeGate,
    expected_network: NetworkId,
    timeout: Duration,
    fail_fast_on_network_mismatch: bool,
}

impl BridgeExecutor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn WalletSession>,
        gate: PreCrimeGate,
        expected_network: NetworkId,
    ) -> Self {
        Self {
            chain,
            wallet,
            gate,
            expected_network,
            timeout: Duration::from_secs(120),
            fail_fast_on_network_mismatch: true,
        }
    }

    /// Timeout applied to each awaited chain operation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fail_fast_on_network_mismatch(mut self, enabled: bool) -> Self {
        self.fail_fast_on_network_mismatch = enabled;
        self
    }

    pub fn expected_network(&self) -> NetworkId {
        self.expected_network
    }

    /// Run one pending item up to a confirmed bridge transaction.
    ///
    /// `on_transition` is called after every state change of `item`.
    pub async fn execute(
        &self,
        item: &mut BridgeItem,
        on_transition: &(dyn Fn(&BridgeItem) + Send + Sync),
    ) -> Result<TxHash, BridgeFault> {
        self.guard_network()?;

        item.begin_approval()
            .map_err(|e| illegal_transition(e, BridgeFault::approval_failed))?;
        on_transition(item);

        let receipt = self.approve(item).await?;
        item.record_approval(receipt)
            .map_err(|e| illegal_transition(e, BridgeFault::approval_failed))?;

        self.validate(item).await?;

        self.guard_network()?;
        item.begin_bridging()
            .map_err(|e| illegal_transition(e, BridgeFault::validation_failed))?;
        on_transition(item);

        let hash = self.submit(item).await?;
        item.record_transaction_hash(hash.clone())
            .map_err(|e| illegal_transition(e, BridgeFault::confirmation_timeout))?;
        on_transition(item);

        self.confirm(item, &hash).await?;
        Ok(hash)
    }

    fn guard_network(&self) -> Result<(), BridgeFault> {
        let active = self.wallet.active_network();
        if active == self.expected_network {
            return Ok(());
        }
        let fault = BridgeFault::network_mismatch(format!(
            "wallet is on network {}, batch expects {}",
            active, self.expected_network
        ));
        if self.fail_fast_on_network_mismatch {
            Err(fault.fatal())
        } else {
            Err(fault)
        }
    }

    async fn approve(&self, item: &BridgeItem) -> Result<ApprovalReceipt, BridgeFault> {
        let token_id = item.token_id();

        let required = match bounded(self.timeout, self.chain.approval_required(token_id)).await {
            Step::Done(required) => required,
            Step::Failed(e) => return Err(approval_fault(e)),
            Step::TimedOut => {
                return Err(BridgeFault::approval_failed(format!(
                    "approval check timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        };
        if !required {
            tracing::debug!(token_id = %token_id, "[BridgeExecutor] Approval already in place");
            return Ok(ApprovalReceipt::pre_approved());
        }

        match bounded(self.timeout, self.chain.submit_approval(token_id)).await {
            Step::Done(receipt) => {
                tracing::debug!(
                    token_id = %token_id,
                    block = ?receipt.block_number,
                    "[BridgeExecutor] Approval mined"
                );
                Ok(receipt)
            }
            Step::Failed(e) => Err(approval_fault(e)),
            Step::TimedOut => Err(BridgeFault::approval_failed(format!(
                "approval receipt not received after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn validate(&self, item: &mut BridgeItem) -> Result<(), BridgeFault> {
        let destination = item.destination().clone();
        let verdict = self
            .gate
            .validate_within(item, &destination, self.timeout)
            .await;

        let passes = verdict.passes();
        let fault = if passes {
            None
        } else {
            let reason = verdict
                .error
                .clone()
                .unwrap_or_else(|| "negative PreCrime verdict".to_string());
            Some(if is_simulation_unavailable(&verdict) {
                BridgeFault::simulation_unavailable(reason)
            } else {
                BridgeFault::validation_failed(reason)
            })
        };

        item.record_verdict(verdict)
            .map_err(|e| illegal_transition(e, BridgeFault::validation_failed))?;

        match fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    async fn submit(&self, item: &BridgeItem) -> Result<TxHash, BridgeFault> {
        let token_id = item.token_id();
        match bounded(
            self.timeout,
            self.chain.submit_bridge(token_id, item.destination()),
        )
        .await
        {
            Step::Done(hash) => {
                tracing::info!(token_id = %token_id, tx_hash = %hash, "[BridgeExecutor] Bridge submitted");
                Ok(hash)
            }
            Step::Failed(e) if e.is_unavailable() => {
                Err(BridgeFault::bridge_submission_failed(e.to_string()).fatal())
            }
            Step::Failed(e) => Err(BridgeFault::bridge_submission_failed(e.to_string())),
            // The transaction may have been broadcast without the hash reaching us.
            Step::TimedOut => Err(BridgeFault::confirmation_timeout(format!(
                "no transaction hash after {}ms; the bridge transaction may still land",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn confirm(&self, item: &BridgeItem, hash: &TxHash) -> Result<(), BridgeFault> {
        let token_id = item.token_id();
        match bounded(self.timeout, self.chain.await_confirmation(hash, self.timeout)).await {
            Step::Done(confirmation) => {
                tracing::info!(
                    token_id = %token_id,
                    tx_hash = %hash,
                    block = confirmation.block_number,
                    "[BridgeExecutor] Bridge confirmed"
                );
                Ok(())
            }
            Step::Failed(ChainError::Reverted(reason)) => Err(BridgeFault::bridge_submission_failed(
                format!("bridge transaction {} reverted: {}", hash, reason),
            )),
            Step::Failed(e) if e.is_unavailable() => Err(BridgeFault::confirmation_timeout(
                format!("lost chain connection while awaiting {}: {}", hash, e),
            )
            .fatal()),
            Step::Failed(e) => Err(BridgeFault::confirmation_timeout(format!(
                "confirmation of {} failed: {}",
                hash, e
            ))),
            Step::TimedOut => Err(BridgeFault::confirmation_timeout(format!(
                "{} not confirmed after {}ms",
                hash,
                self.timeout.as_millis()
            ))),
        }
    }
}

fn approval_fault(e: ChainError) -> BridgeFault {
    match e {
        ChainError::Rejected(reason) => BridgeFault::approval_rejected(reason),
        e if e.is_unavailable() => BridgeFault::approval_failed(e.to_string()).fatal(),
        e => BridgeFault::approval_failed(e.to_string()),
    }
}

/// An illegal state machine move inside the executor is a bug; stop the batch.
fn illegal_transition(err: CoreError, fault: fn(String) -> BridgeFault) -> BridgeFault {
    tracing::error!(error = %err, "[BridgeExecutor] Illegal item transition");
    fault(err.to_string()).fatal()
}
