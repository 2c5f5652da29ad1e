// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB v2 Line Protocol encoding of row batches.
//!
//! Line Protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ns
//! ```
//!
//! See: <https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/>

use crate::classify::LIST_SEPARATOR;
use crate::rows::{AlertRow, IpAllocationRow, RowBatch, TelemetryRow};
use std::fmt;

/// Measurement for telemetry rows.
pub const TELEMETRY_MEASUREMENT: &str = "telemetry";
/// Measurement for alert rows.
pub const ALERTS_MEASUREMENT: &str = "alerts";
/// Measurement for IP allocation rows.
pub const IP_ALLOCATIONS_MEASUREMENT: &str = "ip_allocations";

/// A value that can be stored in an InfluxDB field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit floating point.
    Float(f64),
    /// 64-bit signed integer.
    Integer(i64),
    /// UTF-8 string.
    String(String),
}

impl FieldValue {
    /// Format this value for InfluxDB Line Protocol.
    ///
    /// - Float: written as-is (e.g., `3.25`)
    /// - Integer: suffixed with `i` (e.g., `42i`)
    /// - String: quoted with double quotes, inner quotes escaped (e.g., `"hello"`)
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{}", v),
            FieldValue::Integer(v) => format!("{}i", v),
            FieldValue::String(v) => {
                let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line_protocol())
    }
}

/// Accumulates points and hands them out as Line Protocol lines.
#[derive(Debug, Default)]
pub struct LineProtocolWriter {
    buffer: Vec<String>,
}

impl LineProtocolWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Write a single point.
    ///
    /// Tags are sorted by key. Non-finite floats are not representable and
    /// are skipped. Returns `false` (and writes nothing) when no field is
    /// left, since InfluxDB rejects points without fields.
    pub fn write_point(
        &mut self,
        measurement: &str,
        tags: &[(&str, &str)],
        fields: &[(&str, FieldValue)],
        timestamp_ns: u64,
    ) -> bool {
        let fields: Vec<_> = fields
            .iter()
            .filter(|(_, v)| !matches!(v, FieldValue::Float(f) if !f.is_finite()))
            .collect();
        if fields.is_empty() {
            return false;
        }

        let mut line = escape_measurement(measurement);

        let mut sorted_tags: Vec<_> = tags.iter().filter(|(_, v)| !v.is_empty()).collect();
        sorted_tags.sort_by_key(|(k, _)| *k);
        for (key, value) in &sorted_tags {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');
        for (i, (key, value)) in fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&value.to_line_protocol());
        }

        line.push(' ');
        line.push_str(&timestamp_ns.to_string());

        self.buffer.push(line);
        true
    }

    pub fn write_telemetry(&mut self, row: &TelemetryRow) -> bool {
        let mut fields: Vec<(&str, FieldValue)> = row
            .metrics
            .iter()
            .map(|(k, v)| (k.as_str(), FieldValue::Float(*v)))
            .collect();
        fields.extend(
            row.info
                .iter()
                .map(|(k, v)| (k.as_str(), FieldValue::String(v.clone()))),
        );

        self.write_point(
            TELEMETRY_MEASUREMENT,
            &[
                ("device_id", row.device_id.as_str()),
                ("device_type", row.device_type.as_str()),
            ],
            &fields,
            row.ts_ns,
        )
    }

    pub fn write_alert(&mut self, row: &AlertRow) -> bool {
        self.write_point(
            ALERTS_MEASUREMENT,
            &[
                ("device_id", row.device_id.as_str()),
                ("device_type", row.device_type.as_str()),
                ("alert_code", row.alert_code.as_str()),
            ],
            &[("alert_name", FieldValue::String(row.alert_name.clone()))],
            row.ts_ns,
        )
    }

    pub fn write_ip_allocation(&mut self, row: &IpAllocationRow) -> bool {
        self.write_point(
            IP_ALLOCATIONS_MEASUREMENT,
            &[("device_id", row.device_id.as_str())],
            &[
                ("ipv4", FieldValue::String(row.ipv4.join(LIST_SEPARATOR))),
                ("ipv6_ue", FieldValue::String(row.ipv6_ue.join(LIST_SEPARATOR))),
                ("ipv6_cpe", FieldValue::String(row.ipv6_cpe.join(LIST_SEPARATOR))),
                ("addresses", FieldValue::Integer(row.address_count() as i64)),
            ],
            row.ts_ns,
        )
    }

    /// Flush the buffer, returning all accumulated lines.
    pub fn flush(&mut self) -> Vec<String> {
        std::mem::take(&mut self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Encode every row of a batch, one point per row.
pub fn encode_batch(batch: &RowBatch) -> Vec<String> {
    let mut writer = LineProtocolWriter::new();
    for row in &batch.telemetry {
        if !writer.write_telemetry(row) {
            tracing::debug!("telemetry row for {} has no fields, skipped", row.device_id);
        }
    }
    for row in &batch.alerts {
        writer.write_alert(row);
    }
    for row in &batch.ip_allocations {
        writer.write_ip_allocation(row);
    }
    writer.flush()
}

/// Spaces and commas must be escaped in measurement names.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Commas, equals signs and spaces must be escaped in tag keys, tag values
/// and field keys.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
