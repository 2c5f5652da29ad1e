// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Starlink Telemetry Bridge
//!
//! Polls the Starlink fleet telemetry stream every cadence interval and
//! republishes each batch to one or more downstream stores.
//!
//! # Features
//!
//! - **ClickHouse**: bulk `JSONEachRow` inserts into three MergeTree tables
//! - **InfluxDB v2**: one line protocol point per row
//! - **Prometheus**: latest batch served on `GET /metrics`
//! - **Unbounded retry**: capped exponential backoff, stoppable on shutdown
//!
//! # Quick Start
//!
//! ```bash
//! export CLIENT_ID=... CLIENT_SECRET=...
//! export CLICKHOUSE_URL=http://localhost:8123
//! starlink-bridge
//!
//! # Prometheus only
//! starlink-bridge --sinks prometheus --metrics-port 9100
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod poller;
pub mod retry;
pub mod shutdown;
pub mod sinks;
pub mod token;

#[cfg(test)]
mod test_support;

pub use config::{BridgeConfig, ConfigError, SinkKind};
pub use dispatch::{Sink, SinkDispatcher};
pub use error::{AuthError, BridgeError, SinkError, StreamError};
pub use pipeline::{Bridge, CycleReport};
pub use poller::StreamPoller;
pub use retry::RetryConfig;
pub use shutdown::Shutdown;
pub use token::TokenManager;
