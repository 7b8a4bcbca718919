//! Batch Options & Builder
//!
//! `BatchOptions` is the configuration a caller passes with every batch. It
//! can be deserialized (camelCase JSON, every field defaulted) and checked with
//! [`BatchOptions::validate`], or assembled with [`BatchOptionsBuilder`], which
//! validates at build time:
//!
//! 1. Create with `::new()` or `::default()`
//! 2. Chain `.field(value)` calls
//! 3. Call `.build()` which validates and returns `CoreResult<BatchOptions>`

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Upper bound on simultaneously in-flight items.
pub const MAX_CONCURRENCY: usize = 64;

/// Upper bound on extra attempts per item.
pub const MAX_RETRIES: u32 = 16;

// ============================================================================
// BatchOptions
// ============================================================================

/// Per-batch execution options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    /// Maximum number of items simultaneously approving/bridging.
    ///
    /// `1` keeps submission order equal to input order, which is what a
    /// single signing account with one nonce sequence needs.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Re-dispatch items that failed with a retryable fault
    #[serde(default)]
    pub retry_failed_on_submit: bool,
    /// Timeout applied to each awaited chain operation
    #[serde(default = "default_per_item_timeout_ms")]
    pub per_item_timeout_ms: u64,
    /// Extra attempts per item when `retry_failed_on_submit` is set
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Stop dispatching when the wallet switches networks mid-batch
    #[serde(default = "default_fail_fast_on_network_mismatch")]
    pub fail_fast_on_network_mismatch: bool,
}

fn default_concurrency() -> usize {
    1
}

fn default_per_item_timeout_ms() -> u64 {
    120_000
}

fn default_max_retries() -> u32 {
    1
}

fn default_fail_fast_on_network_mismatch() -> bool {
    true
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry_failed_on_submit: false,
            per_item_timeout_ms: default_per_item_timeout_ms(),
            max_retries: default_max_retries(),
            fail_fast_on_network_mismatch: default_fail_fast_on_network_mismatch(),
        }
    }
}

impl BatchOptions {
    /// Validate option ranges.
    pub fn validate(&self) -> CoreResult<()> {
        if self.concurrency == 0 {
            return Err(CoreError::validation("concurrency must be >= 1"));
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(CoreError::validation(format!(
                "concurrency must be <= {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }
        if self.per_item_timeout_ms == 0 {
            return Err(CoreError::validation("perItemTimeoutMs must be > 0"));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(CoreError::validation(format!(
                "maxRetries must be <= {}, got {}",
                MAX_RETRIES, self.max_retries
            )));
        }
        Ok(())
    }

    /// Timeout for each awaited chain operation.
    pub fn per_item_timeout(&self) -> Duration {
        Duration::from_millis(self.per_item_timeout_ms)
    }

    /// Total attempts an item may get, including the first.
    pub fn max_attempts(&self) -> u32 {
        if self.retry_failed_on_submit {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }
}

// ============================================================================
// BatchOptionsBuilder
// ============================================================================

/// Builder for batch options.
///
/// # Example
/// ```ignore
/// let options = BatchOptionsBuilder::new()
///     .concurrency(2)
///     .retry_failed_on_submit(true)
///     .per_item_timeout_ms(30_000)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct BatchOptionsBuilder {
    concurrency: Option<usize>,
    retry_failed_on_submit: Option<bool>,
    per_item_timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    fail_fast_on_network_mismatch: Option<bool>,
}

impl BatchOptionsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker bound.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = Some(n);
        self
    }

    /// Enable or disable re-dispatch of retryable failures.
    pub fn retry_failed_on_submit(mut self, enabled: bool) -> Self {
        self.retry_failed_on_submit = Some(enabled);
        self
    }

    /// Set the per-operation timeout in milliseconds.
    pub fn per_item_timeout_ms(mut self, ms: u64) -> Self {
        self.per_item_timeout_ms = Some(ms);
        self
    }

    /// Set the number of extra attempts per item.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Enable or disable stopping the batch on a network switch.
    pub fn fail_fast_on_network_mismatch(mut self, enabled: bool) -> Self {
        self.fail_fast_on_network_mismatch = Some(enabled);
        self
    }

    /// Build and validate the options.
    pub fn build(self) -> CoreResult<BatchOptions> {
        let defaults = BatchOptions::default();
        let options = BatchOptions {
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            retry_failed_on_submit: self
                .retry_failed_on_submit
                .unwrap_or(defaults.retry_failed_on_submit),
            per_item_timeout_ms: self
                .per_item_timeout_ms
                .unwrap_or(defaults.per_item_timeout_ms),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            fail_fast_on_network_mismatch: self
                .fail_fast_on_network_mismatch
                .unwrap_or(defaults.fail_fast_on_network_mismatch),
        };
        options.validate()?;
        Ok(options)
    }
}
