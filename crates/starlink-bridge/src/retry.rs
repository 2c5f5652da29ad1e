// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unbounded retry with exponential backoff.
//!
//! Network calls are retried until they succeed: the delay starts at the
//! base, doubles after every failure and is capped at the maximum. The only
//! way out of a failing loop is the [`Shutdown`] handle.

use crate::error::{SinkError, StreamError};
use crate::shutdown::Shutdown;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Configuration for retry backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay after the first failure.
    pub base: Duration,
    /// Maximum delay cap.
    pub max: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Stateful backoff sequence.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    retries: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, retries: 0 }
    }

    /// Delay to wait now; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.config.delay(self.retries);
        self.retries = self.retries.saturating_add(1);
        delay
    }

    /// Delays handed out so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// A retry loop was stopped through the shutdown handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl From<Cancelled> for SinkError {
    fn from(_: Cancelled) -> Self {
        SinkError::Cancelled
    }
}

impl From<Cancelled> for StreamError {
    fn from(_: Cancelled) -> Self {
        StreamError::Cancelled
    }
}

/// Run `op` until it succeeds.
///
/// Every failure is logged and followed by a backoff sleep. Once `shutdown`
/// is stopped no further attempt is made and `Cancelled` is returned.
pub async fn retry_until_success<T, E, F, Fut>(
    what: &str,
    config: RetryConfig,
    shutdown: &Shutdown,
    mut op: F,
) -> Result<T, Cancelled>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = Backoff::new(config);
    loop {
        match op().await {
            Ok(value) => {
                if backoff.retries() > 0 {
                    tracing::info!("{} succeeded after {} retries", what, backoff.retries());
                }
                return Ok(value);
            }
            Err(e) => {
                if !shutdown.is_running() {
                    return Err(Cancelled);
                }
                let delay = backoff.next_delay();
                tracing::warn!("{} failed: {}; retrying in {:?}", what, e, delay);
                if !shutdown.sleep(delay).await {
                    return Err(Cancelled);
                }
            }
        }
    }
}
