//! Bounded retry with exponential backoff for transient storage failures.
//!
//! Only `StorageError`s reporting a transient condition (lock contention,
//! timeout) are retried; business errors never reach this layer. Attempts
//! and delays are bounded so no operation blocks indefinitely.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::errors::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 25,
            max_delay_ms: 1000,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryHandler {
    config: RetryConfig,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `operation`, retrying transient failures with backoff until it
    /// succeeds, fails non-transiently, or the attempt budget runs out.
    pub async fn execute<A, F, T>(&self, operation: A) -> Result<T, StorageError>
    where
        A: FnMut() -> F,
        F: std::future::Future<Output = Result<T, StorageError>>,
    {
        let delays = self.delays();
        debug!(
            max_attempts = self.config.max_attempts,
            base_delay_ms = self.config.base_delay_ms,
            "Running storage operation with bounded retry"
        );

        RetryIf::spawn(delays, operation, |err: &StorageError| {
            let retryable = err.is_transient();
            if retryable {
                warn!(error = %err, "Transient storage failure, backing off");
            }
            retryable
        })
        .await
    }

    fn delays(&self) -> Vec<Duration> {
        let backoff = ExponentialBackoff::from_millis(self.config.base_delay_ms)
            .max_delay(Duration::from_millis(self.config.max_delay_ms))
            .take(self.config.max_attempts.saturating_sub(1) as usize);
        if self.config.jitter {
            backoff.map(jitter).collect()
        } else {
            backoff.collect()
        }
    }
}
