//! Progress Aggregator
//!
//! Owns the single `BatchBridgeProgress` of a batch. Workers report every item
//! transition here; the aggregator folds it into the progress, counts each
//! token at most once, and fans an owned snapshot out to the observers.
//!
//! Observers are called while the internal lock is held, so delivery for one
//! batch is serialized and ordered. An observer must not call back into the
//! same aggregator.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use batch_bridge_core::{BridgeItem, BridgeStatus, TokenId};
use uuid::Uuid;

use crate::models::{BatchBridgeProgress, BridgeResult, ProgressCallback};

/// Internal aggregator state.
struct AggregatorState {
    progress: BatchBridgeProgress,
    /// Tokens belonging to this batch
    expected: HashSet<TokenId>,
    /// Tokens already counted as terminal
    recorded: HashSet<TokenId>,
    /// In-flight items, least recently transitioned first
    in_flight: Vec<BridgeItem>,
    observers: Vec<ProgressCallback>,
    /// Set once the run has delivered its final snapshot
    closed: bool,
}

impl AggregatorState {
    fn notify(&self) {
        for observer in &self.observers {
            observer(self.progress.clone());
        }
    }
}

/// Serialized owner of a batch's progress.
pub struct ProgressAggregator {
    state: Mutex<AggregatorState>,
}

impl ProgressAggregator {
    pub fn new<I>(batch_id: Uuid, token_ids: I) -> Self
    where
        I: IntoIterator<Item = TokenId>,
    {
        let expected: HashSet<TokenId> = token_ids.into_iter().collect();
        Self {
            state: Mutex::new(AggregatorState {
                progress: BatchBridgeProgress::new(batch_id, expected.len()),
                expected,
                recorded: HashSet::new(),
                in_flight: Vec::new(),
                observers: Vec::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // A panicking observer must not wedge the batch.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fold an item transition into the progress.
    ///
    /// Returns `false` when the event was ignored: unknown token, or a late
    /// event for a token already counted as terminal.
    pub fn apply_transition(&self, item: &BridgeItem) -> bool {
        let mut state = self.lock();
        let token_id = item.token_id();

        if !state.expected.contains(token_id) {
            tracing::warn!(
                batch_id = %state.progress.batch_id,
                token_id = %token_id,
                "[ProgressAggregator] Ignoring event for unknown token"
            );
            return false;
        }
        if state.recorded.contains(token_id) {
            tracing::debug!(
                batch_id = %state.progress.batch_id,
                token_id = %token_id,
                status = %item.status(),
                "[ProgressAggregator] Ignoring late event for terminal token"
            );
            return false;
        }

        state.in_flight.retain(|i| i.token_id() != token_id);

        match item.status() {
            BridgeStatus::Approving | BridgeStatus::Bridging => {
                state.in_flight.push(item.clone());
            }
            BridgeStatus::Pending => {}
            BridgeStatus::Success | BridgeStatus::Failed => {
                state.recorded.insert(token_id.clone());
                if item.status() == BridgeStatus::Success {
                    state.progress.completed += 1;
                } else {
                    state.progress.failed += 1;
                }
                state.progress.results.push(BridgeResult::from_item(item));
            }
        }

        state.progress.current = state.in_flight.last().cloned();
        state.progress.in_flight = state.in_flight.len();
        state.notify();
        true
    }

    /// Register an observer. It immediately receives the current snapshot.
    ///
    /// After [`close`](Self::close) the snapshot is still delivered but the
    /// observer is not retained.
    pub fn subscribe(&self, observer: ProgressCallback) {
        let mut state = self.lock();
        observer(state.progress.clone());
        if !state.closed {
            state.observers.push(observer);
        }
    }

    /// Drop every observer. Called by the run once no further transitions
    /// can arrive.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.observers.clear();
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Latest reported state of an in-flight item.
    pub fn in_flight_item(&self, token_id: &TokenId) -> Option<BridgeItem> {
        self.lock()
            .in_flight
            .iter()
            .find(|i| i.token_id() == token_id)
            .cloned()
    }

    /// Whether a terminal status has been counted for `token_id`.
    pub fn is_recorded(&self, token_id: &TokenId) -> bool {
        self.lock().recorded.contains(token_id)
    }

    /// Owned copy of the current progress.
    pub fn snapshot(&self) -> BatchBridgeProgress {
        self.lock().progress.clone()
    }

    pub fn batch_id(&self) -> Uuid {
        self.lock().progress.batch_id
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("progress", &self.snapshot())
            .finish()
    }
}
