// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sink abstraction and per-cycle dispatch.
//!
//! Each configured sink gets its own task per cycle. A task retries the
//! whole batch until the sink accepts it, and the cycle waits for every
//! task, so delivery is at-least-once and in cycle order.

use crate::error::SinkError;
use crate::retry::{retry_until_success, RetryConfig};
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use starlink_telemetry::RowBatch;
use std::sync::Arc;
use tokio::task::JoinSet;

/// A downstream store for one cycle's rows.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Deliver the batch once. Retrying is the dispatcher's job; an
    /// implementation must tolerate receiving the same batch again.
    async fn export(&self, batch: &RowBatch) -> Result<(), SinkError>;
}

/// Fans a batch out to every configured sink.
pub struct SinkDispatcher {
    sinks: Vec<Arc<dyn Sink>>,
    retry: RetryConfig,
    shutdown: Shutdown,
}

impl SinkDispatcher {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            sinks: Vec::new(),
            retry: RetryConfig::default(),
            shutdown,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deliver `batch` to every sink, returning how many accepted it.
    ///
    /// An empty batch is not dispatched. Returns `SinkError::Cancelled` if
    /// any sink was still retrying when shutdown was requested.
    pub async fn dispatch(&self, batch: RowBatch) -> Result<usize, SinkError> {
        if batch.is_empty() {
            tracing::debug!("Empty batch, nothing to dispatch");
            return Ok(0);
        }

        let batch = Arc::new(batch);
        let mut tasks = JoinSet::new();
        for sink in &self.sinks {
            let sink = sink.clone();
            let batch = batch.clone();
            let shutdown = self.shutdown.clone();
            let retry = self.retry;
            tasks.spawn(async move {
                let name = sink.name();
                let result = retry_until_success(
                    &format!("{} export", name),
                    retry,
                    &shutdown,
                    || sink.export(&batch),
                )
                .await;
                (name, result)
            });
        }

        let mut delivered = 0;
        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    tracing::debug!("{} accepted {} rows", name, batch.len());
                    delivered += 1;
                }
                Ok((name, Err(_))) => {
                    tracing::warn!("{} export cancelled by shutdown", name);
                    cancelled = true;
                }
                Err(e) => tracing::error!("Sink task failed: {}", e),
            }
        }

        if cancelled {
            Err(SinkError::Cancelled)
        } else {
            Ok(delivered)
        }
    }
}
