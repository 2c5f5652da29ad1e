// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Prometheus pull endpoint.
//!
//! Each export renders the batch and swaps it in as the current snapshot.
//! `GET /metrics` serves whatever snapshot is current, whole.

use crate::dispatch::Sink;
use crate::error::SinkError;
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use starlink_telemetry::exposition::{render_batch, PLACEHOLDER};
use starlink_telemetry::RowBatch;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Latest rendered exposition lines.
///
/// Writers replace the snapshot as a whole under the write lock, so a
/// reader sees either the previous or the new snapshot, never a mix.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Option<Arc<Vec<String>>>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, lines: Vec<String>) {
        *self.inner.write().await = Some(Arc::new(lines));
    }

    /// Current snapshot, `None` until the first replace.
    pub async fn read(&self) -> Option<Arc<Vec<String>>> {
        self.inner.read().await.clone()
    }

    /// Response body for the current snapshot.
    pub async fn body(&self) -> String {
        match self.read().await {
            Some(lines) => {
                let mut body = lines.join("\n");
                body.push('\n');
                body
            }
            None => format!("{}\n", PLACEHOLDER),
        }
    }
}

/// Renders batches into the snapshot store.
#[derive(Debug, Clone)]
pub struct ExpositionSink {
    store: SnapshotStore,
    prefix: String,
}

impl ExpositionSink {
    pub fn new(store: SnapshotStore, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }
}

#[async_trait]
impl Sink for ExpositionSink {
    fn name(&self) -> &'static str {
        "prometheus"
    }

    async fn export(&self, batch: &RowBatch) -> Result<(), SinkError> {
        let lines = render_batch(batch, &self.prefix);
        tracing::debug!("Exposition snapshot replaced ({} lines)", lines.len());
        self.store.replace(lines).await;
        Ok(())
    }
}

/// Router serving `GET /metrics`; every other path is a 404.
pub fn metrics_router(store: SnapshotStore) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn metrics(State(store): State<SnapshotStore>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        store.body().await,
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found\n")
}

/// Bind the pull endpoint.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

/// Serve the pull endpoint until shutdown.
pub async fn serve(
    listener: TcpListener,
    store: SnapshotStore,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Metrics endpoint: http://{}/metrics", addr);
    }
    axum::serve(listener, metrics_router(store))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
