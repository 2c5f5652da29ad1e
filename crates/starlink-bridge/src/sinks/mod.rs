// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concrete sinks.

pub mod clickhouse;
pub mod exposition;
pub mod influx;

pub use clickhouse::{ClickHouseConfig, ClickHouseSink};
pub use exposition::{ExpositionSink, SnapshotStore};
pub use influx::{InfluxConfig, InfluxSink};
