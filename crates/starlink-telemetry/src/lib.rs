// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Starlink Fleet Telemetry
//!
//! Turns the positional telemetry batches returned by the fleet stream API
//! into typed rows, and encodes those rows for downstream stores.
//!
//! This crate provides:
//! - Wire payload types for the token and stream endpoints
//! - A per-cycle schema catalog (column layouts, device type and alert names)
//! - Positional row decoding with drop accounting
//! - Field classification into metrics, info, alerts and IP allocations
//! - InfluxDB v2 Line Protocol and Prometheus text encoders
//!
//! # Overview
//!
//! The crate performs no I/O. Every stage is a pure function over the
//! cycle's response payload.
//!
//! ```text
//! StreamResponse --> decode --> classify --> RowBatch --> line_protocol / exposition / JSONEachRow
//! ```

pub mod catalog;
pub mod classify;
pub mod decoder;
pub mod device;
pub mod exposition;
pub mod line_protocol;
pub mod payload;
pub mod rows;

pub use catalog::DeviceSchemaCatalog;
pub use classify::{classify, classify_value, FieldClass};
pub use decoder::{decode, decode_with_stats, DecodeStats, RawEntry, Record};
pub use device::DeviceKind;
pub use line_protocol::LineProtocolWriter;
pub use payload::{StreamRequest, StreamResponse, TokenResponse};
pub use rows::{build_rows, AlertRow, BuildStats, IpAllocationRow, RowBatch, TelemetryRow};
