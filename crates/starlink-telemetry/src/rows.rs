// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed output rows.
//!
//! Serialized field names match the analytical store columns, so a row
//! serializes directly into one `JSONEachRow` line.

use crate::catalog::DeviceSchemaCatalog;
use crate::classify::{classify, Classified};
use crate::decoder::{decode_with_stats, DecodeStats, RawEntry};
use serde::Serialize;
use std::collections::BTreeMap;

/// Telemetry sample for any device type except IP allocations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRow {
    /// Device type display label.
    pub device_type: String,
    pub device_id: String,
    pub ts_ns: u64,
    pub metrics: BTreeMap<String, f64>,
    pub info: BTreeMap<String, String>,
}

/// One active alert on a user terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRow {
    /// Device type display label.
    pub device_type: String,
    pub device_id: String,
    pub ts_ns: u64,
    /// Resolved display name (raw code when the catalog has no entry).
    pub alert_name: String,
    /// Raw alert code; not a store column.
    #[serde(skip)]
    pub alert_code: String,
}

/// IP allocations reported for one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpAllocationRow {
    pub device_id: String,
    pub ts_ns: u64,
    pub ipv4: Vec<String>,
    pub ipv6_ue: Vec<String>,
    pub ipv6_cpe: Vec<String>,
}

impl IpAllocationRow {
    /// Total number of addresses across all families.
    pub fn address_count(&self) -> usize {
        self.ipv4.len() + self.ipv6_ue.len() + self.ipv6_cpe.len()
    }
}

/// All rows produced by one poll cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    pub telemetry: Vec<TelemetryRow>,
    pub alerts: Vec<AlertRow>,
    pub ip_allocations: Vec<IpAllocationRow>,
}

impl RowBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the output of one classified record.
    pub fn push(&mut self, classified: Classified) {
        if let Some(row) = classified.telemetry {
            self.telemetry.push(row);
        }
        self.alerts.extend(classified.alerts);
        if let Some(row) = classified.ip_allocation {
            self.ip_allocations.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.telemetry.is_empty() && self.alerts.is_empty() && self.ip_allocations.is_empty()
    }

    /// Total rows across all groups.
    pub fn len(&self) -> usize {
        self.telemetry.len() + self.alerts.len() + self.ip_allocations.len()
    }
}

/// Counters for one `build_rows` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub decode: DecodeStats,
    /// Records dropped for a missing device id or timestamp.
    pub missing_key: usize,
}

/// Decode and classify a batch of raw entries.
pub fn build_rows(entries: &[RawEntry], catalog: &DeviceSchemaCatalog) -> (RowBatch, BuildStats) {
    let (records, decode) = decode_with_stats(entries, catalog);
    let mut stats = BuildStats {
        decode,
        missing_key: 0,
    };

    let mut batch = RowBatch::new();
    for record in &records {
        match classify(record, catalog) {
            Some(classified) => batch.push(classified),
            None => {
                tracing::debug!(
                    "dropping '{}' record without device id or timestamp",
                    record.device_type()
                );
                stats.missing_key += 1;
            }
        }
    }

    (batch, stats)
}
