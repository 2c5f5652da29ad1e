// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Starlink Telemetry Bridge CLI
//!
//! # Usage
//!
//! ```bash
//! # ClickHouse (default sink), settings from .env
//! starlink-bridge
//!
//! # All three sinks
//! starlink-bridge --sinks clickhouse,influxdb,prometheus
//! ```

use anyhow::Context;
use clap::Parser;
use reqwest::Client;
use starlink_bridge::retry::retry_until_success;
use starlink_bridge::sinks::{exposition, ClickHouseSink, ExpositionSink, InfluxSink, SnapshotStore};
use starlink_bridge::{
    Bridge, BridgeConfig, RetryConfig, Shutdown, SinkDispatcher, SinkError, SinkKind,
    StreamPoller, TokenManager,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenv::dotenv().ok();
    let config = BridgeConfig::parse();

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    config.validate().context("invalid configuration")?;
    info!("Starlink telemetry bridge v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            signal.stop();
        }
    });

    let (client_id, client_secret) = config.credentials()?;
    let client = Client::builder()
        .timeout(config.stream_timeout())
        .build()
        .context("building HTTP client")?;
    let mut tokens = TokenManager::new(client.clone(), &config.auth_url, client_id, client_secret);
    tokens
        .acquire()
        .await
        .context("acquiring initial access token")?;
    info!("Access token acquired");

    let mut dispatcher = SinkDispatcher::new(shutdown.clone());

    if config.is_enabled(SinkKind::Clickhouse) {
        let sink = ClickHouseSink::new(config.clickhouse()?, config.sink_timeout())?;
        retry_until_success(
            "ClickHouse table provisioning",
            RetryConfig::default(),
            &shutdown,
            || sink.ensure_tables(),
        )
        .await
        .map_err(SinkError::from)
        .context("provisioning ClickHouse tables")?;
        dispatcher = dispatcher.with_sink(Arc::new(sink));
    }

    if config.is_enabled(SinkKind::Influxdb) {
        let sink = InfluxSink::new(config.influx()?, config.sink_timeout())?;
        dispatcher = dispatcher.with_sink(Arc::new(sink));
    }

    let mut server = None;
    if config.is_enabled(SinkKind::Prometheus) {
        let addr = config.metrics_addr();
        let listener = exposition::bind(addr)
            .await
            .with_context(|| format!("binding metrics endpoint on {}", addr))?;
        let store = SnapshotStore::new();
        server = Some(tokio::spawn(exposition::serve(
            listener,
            store.clone(),
            shutdown.clone(),
        )));
        dispatcher = dispatcher.with_sink(Arc::new(ExpositionSink::new(
            store,
            config.metrics_prefix.clone(),
        )));
    }

    let poller = StreamPoller::new(
        client,
        config.stream_url.clone(),
        config.stream_request(),
        tokens,
        shutdown.clone(),
    );
    let mut bridge = Bridge::new(poller, dispatcher, config.cadence(), shutdown.clone());
    bridge.run().await?;

    shutdown.stop();
    if let Some(server) = server {
        server
            .await
            .context("metrics server task")?
            .context("metrics server")?;
    }

    Ok(())
}
