// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Positional row decoding.
//!
//! Each raw entry should be a JSON array whose element 0 is the device-type code.
//! The remaining elements line up with the column layout the catalog holds
//! for that code. Layouts that start with the `DeviceType` column describe
//! the whole entry, code included, and are aligned from element 0 instead.
//!
//! Decoding never fails: entries that cannot be decoded are counted in
//! [`DecodeStats`] and dropped.

use crate::catalog::DeviceSchemaCatalog;
use crate::device::{
    normalize_device_id, DeviceKind, DEVICE_ID_FIELD, DEVICE_TYPE_FIELD, TIMESTAMP_FIELD,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// One positional telemetry row as received; anything but an array is
/// dropped at decode time.
pub type RawEntry = Value;

/// A raw entry with its values bound to column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    device_type: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(device_type: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            device_type: device_type.into(),
            fields,
        }
    }

    /// Raw device-type code (`u`, `i`, ...).
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn kind(&self) -> DeviceKind {
        DeviceKind::from_code(&self.device_type)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// All populated columns, in column-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Device id used as the join key, `ip-` prefix stripped where it applies.
    ///
    /// Strings are taken as-is and numbers are rendered; any other shape
    /// counts as missing.
    pub fn device_id(&self) -> Option<String> {
        let raw = match self.fields.get(DEVICE_ID_FIELD)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(normalize_device_id(self.kind(), &raw).to_string())
    }

    /// Sample timestamp in Unix nanoseconds.
    pub fn timestamp_ns(&self) -> Option<u64> {
        self.fields.get(TIMESTAMP_FIELD).and_then(coerce_timestamp)
    }
}

/// Accept integral numbers, floats (truncated) and numeric strings.
fn coerce_timestamp(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| float_to_ns(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| float_to_ns(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

fn float_to_ns(v: f64) -> Option<u64> {
    if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 {
        Some(v.trunc() as u64)
    } else {
        None
    }
}

/// Per-batch decode counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Entries handed to the decoder.
    pub received: usize,
    /// Empty or null entries.
    pub empty: usize,
    /// Entries that are not an array.
    pub malformed: usize,
    /// Router entries.
    pub router: usize,
    /// Entries whose device type has no layout this cycle.
    pub unknown_type: usize,
    /// Records produced.
    pub decoded: usize,
    /// Column layouts the catalog rejected this cycle.
    pub rejected_layouts: usize,
}

impl DecodeStats {
    /// Entries that did not produce a record.
    pub fn dropped(&self) -> usize {
        self.empty + self.malformed + self.router + self.unknown_type
    }
}

/// Decode a batch of raw entries against the cycle's catalog.
pub fn decode(entries: &[RawEntry], catalog: &DeviceSchemaCatalog) -> Vec<Record> {
    decode_with_stats(entries, catalog).0
}

/// Decode a batch, also reporting why entries were dropped.
pub fn decode_with_stats(
    entries: &[RawEntry],
    catalog: &DeviceSchemaCatalog,
) -> (Vec<Record>, DecodeStats) {
    let mut stats = DecodeStats {
        received: entries.len(),
        rejected_layouts: catalog.rejected_layouts(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(entries.len());

    for entry in entries {
        let entry = match entry {
            Value::Array(values) => values,
            Value::Null => {
                stats.empty += 1;
                continue;
            }
            other => {
                tracing::debug!("dropping non-array entry: {}", other);
                stats.malformed += 1;
                continue;
            }
        };

        let Some(first) = entry.first() else {
            stats.empty += 1;
            continue;
        };

        let Some(code) = first.as_str() else {
            tracing::debug!("dropping entry with non-string device type: {}", first);
            stats.unknown_type += 1;
            continue;
        };

        if DeviceKind::from_code(code) == DeviceKind::Router {
            stats.router += 1;
            continue;
        }

        let Some(columns) = catalog.columns(code) else {
            tracing::debug!("dropping entry with unknown device type '{}'", code);
            stats.unknown_type += 1;
            continue;
        };

        records.push(bind_columns(code, entry, columns));
        stats.decoded += 1;
    }

    (records, stats)
}

/// Zip entry values against column names; the shorter side wins.
fn bind_columns(code: &str, entry: &[Value], columns: &[String]) -> Record {
    let values = if columns.first().map(String::as_str) == Some(DEVICE_TYPE_FIELD) {
        entry
    } else {
        &entry[1..]
    };

    let fields = columns
        .iter()
        .zip(values.iter())
        .map(|(col, val)| (col.clone(), val.clone()))
        .collect();

    Record::new(code, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> DeviceSchemaCatalog {
        DeviceSchemaCatalog::default()
            .with_columns("u", ["DeviceId", "UtcTimestampNs", "Snr", "State"])
            .with_columns("i", ["DeviceId", "UtcTimestampNs", "Ipv4"])
            .with_columns("r", ["DeviceId", "UtcTimestampNs"])
    }

    #[test]
    fn test_decode_binds_columns_after_code() {
        let entries = vec![json!(["u", "ut01", 1000, 9.5, "online"])];
        let records = decode(&entries, &catalog());

        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.device_type(), "u");
        assert_eq!(rec.get("DeviceId"), Some(&json!("ut01")));
        assert_eq!(rec.get("Snr"), Some(&json!(9.5)));
        assert_eq!(rec.get("State"), Some(&json!("online")));
    }

    #[test]
    fn test_decode_short_and_long_entries() {
        let entries = vec![
            json!(["u", "ut01", 1000]),
            json!(["u", "ut02", 2000, 1.0, "x", "extra", "more"]),
        ];
        let records = decode(&entries, &catalog());

        assert_eq!(records[0].len(), 2);
        assert!(records[0].get("Snr").is_none());
        assert_eq!(records[1].len(), 4);
    }

    #[test]
    fn test_decode_layout_including_device_type_column() {
        let catalog = DeviceSchemaCatalog::default()
            .with_columns("u", ["DeviceType", "UtcTimestampNs", "DeviceId", "Snr"]);
        let entries = vec![json!(["u", 1000, "ut01", 3.0])];
        let records = decode(&entries, &catalog);

        assert_eq!(records[0].get("DeviceType"), Some(&json!("u")));
        assert_eq!(records[0].device_id().as_deref(), Some("ut01"));
        assert_eq!(records[0].timestamp_ns(), Some(1000));
    }

    #[test]
    fn test_decode_drops_and_counts() {
        let entries = vec![
            json!([]),
            json!(null),
            json!("junk"),
            json!({"u": 1}),
            json!(["r", "router01", 1000]),
            json!(["z", "mystery", 1000]),
            json!([42, "odd", 1000]),
            json!(["u", "ut01", 1000]),
        ];
        let catalog = catalog().with_rejected_layouts(1);
        let (records, stats) = decode_with_stats(&entries, &catalog);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].device_id().as_deref(), Some("ut01"));
        assert_eq!(
            stats,
            DecodeStats {
                received: 8,
                empty: 2,
                malformed: 2,
                router: 1,
                unknown_type: 2,
                decoded: 1,
                rejected_layouts: 1,
            }
        );
        assert_eq!(stats.dropped(), 7);
    }

    #[test]
    fn test_unknown_type_never_decodes() {
        let empty = DeviceSchemaCatalog::default();
        let entries = vec![
            json!(["u", "ut01", 1000]),
            json!(["i", "ip-1", 1000]),
        ];
        assert!(decode(&entries, &empty).is_empty());
    }

    #[test]
    fn test_device_id_normalization() {
        let entries = vec![
            json!(["i", "ip-abc123", 1000, ["1.1.1.1"]]),
            json!(["u", "ip-abc123", 1000]),
            json!(["u", 77, 1000]),
        ];
        let records = decode(&entries, &catalog());

        assert_eq!(records[0].device_id().as_deref(), Some("abc123"));
        assert_eq!(records[1].device_id().as_deref(), Some("ip-abc123"));
        assert_eq!(records[2].device_id().as_deref(), Some("77"));
    }

    #[test]
    fn test_timestamp_coercion() {
        let cases = [
            (json!(1_700_000_000_000_000_000u64), Some(1_700_000_000_000_000_000)),
            (json!(1500.9), Some(1500)),
            (json!("1234"), Some(1234)),
            (json!(" 12.5 "), Some(12)),
            (json!(-1), None),
            (json!("soon"), None),
            (json!(null), None),
            (json!([1]), None),
        ];

        for (raw, expected) in cases {
            let rec = Record::new(
                "u",
                BTreeMap::from([("UtcTimestampNs".to_string(), raw.clone())]),
            );
            assert_eq!(rec.timestamp_ns(), expected, "input {}", raw);
        }
    }
}
