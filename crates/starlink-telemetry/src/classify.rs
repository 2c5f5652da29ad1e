// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field classification.
//!
//! Splits a decoded [`Record`] into typed rows:
//!
//! ```text
//! Record ("i") --> IpAllocationRow
//! Record (*)   --> TelemetryRow { metrics, info }
//! Record ("u") --> TelemetryRow + AlertRow per active alert code
//! ```
//!
//! The metric/info split is a heuristic: any value that parses as a number
//! is a metric, everything else is info. It lives in [`classify_value`] so it
//! can be tested on its own or replaced via [`classify_with`].

use crate::catalog::DeviceSchemaCatalog;
use crate::decoder::Record;
use crate::device::{
    is_reserved_field, DeviceKind, ALERT_FIELDS, IPV4_FIELD, IPV6_CPE_FIELD, IPV6_UE_FIELD,
};
use crate::rows::{AlertRow, IpAllocationRow, TelemetryRow};
use serde_json::Value;
use std::collections::BTreeMap;

/// Separator used when collapsing list values into one info string.
pub const LIST_SEPARATOR: &str = ";";

/// Category of a single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldClass {
    Metric(f64),
    Info(String),
}

/// Pluggable value classifier; `None` drops the field.
pub type ValueClassifier = fn(&Value) -> Option<FieldClass>;

/// Rows derived from one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    pub telemetry: Option<TelemetryRow>,
    pub alerts: Vec<AlertRow>,
    pub ip_allocation: Option<IpAllocationRow>,
}

/// Default classification rule.
///
/// Lists collapse to a `;`-joined string (null elements skipped); nulls and
/// empty strings are dropped; a value that coerces to a float is a metric,
/// anything else is info.
pub fn classify_value(value: &Value) -> Option<FieldClass> {
    let cleaned = match value {
        Value::Null => return None,
        Value::Array(items) => Value::String(join_list(items)),
        other => other.clone(),
    };

    if matches!(&cleaned, Value::String(s) if s.is_empty()) {
        return None;
    }

    match to_float(&cleaned) {
        Some(v) => Some(FieldClass::Metric(v)),
        None => Some(FieldClass::Info(scalar_to_string(&cleaned))),
    }
}

/// Classify a record with the default value rule.
///
/// Returns `None` when the record has no usable device id or timestamp.
pub fn classify(record: &Record, catalog: &DeviceSchemaCatalog) -> Option<Classified> {
    classify_with(record, catalog, classify_value)
}

/// Classify a record with a custom value rule.
pub fn classify_with(
    record: &Record,
    catalog: &DeviceSchemaCatalog,
    classifier: ValueClassifier,
) -> Option<Classified> {
    let device_id = record.device_id()?;
    let ts_ns = record.timestamp_ns()?;
    let kind = record.kind();

    if kind == DeviceKind::IpAllocation {
        return Some(Classified {
            ip_allocation: Some(IpAllocationRow {
                device_id,
                ts_ns,
                ipv4: string_list(record.get(IPV4_FIELD)),
                ipv6_ue: string_list(record.get(IPV6_UE_FIELD)),
                ipv6_cpe: string_list(record.get(IPV6_CPE_FIELD)),
            }),
            ..Default::default()
        });
    }

    let mut metrics = BTreeMap::new();
    let mut info = BTreeMap::new();
    for (name, value) in record.fields() {
        if is_reserved_field(name) {
            continue;
        }
        match classifier(value) {
            Some(FieldClass::Metric(v)) => {
                metrics.insert(name.to_string(), v);
            }
            Some(FieldClass::Info(s)) => {
                info.insert(name.to_string(), s);
            }
            None => {}
        }
    }

    let device_type = catalog.device_type_label(record.device_type()).to_string();

    let alerts = if kind == DeviceKind::UserTerminal {
        alert_codes(record)
            .into_iter()
            .map(|code| AlertRow {
                device_type: device_type.clone(),
                device_id: device_id.clone(),
                ts_ns,
                alert_name: catalog.alert_name(record.device_type(), &code).to_string(),
                alert_code: code,
            })
            .collect()
    } else {
        Vec::new()
    };

    Some(Classified {
        telemetry: Some(TelemetryRow {
            device_type,
            device_id,
            ts_ns,
            metrics,
            info,
        }),
        alerts,
        ip_allocation: None,
    })
}

/// Active alert codes of a record.
///
/// The first alert column present with a usable value wins: a list yields
/// one code per non-null element (an empty list yields none), a non-empty
/// scalar yields one code. Null or empty scalars fall through to the next
/// column.
pub fn alert_codes(record: &Record) -> Vec<String> {
    for field in ALERT_FIELDS {
        match record.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => {
                return items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(scalar_to_string)
                    .collect();
            }
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(other) => return vec![scalar_to_string(other)],
        }
    }
    Vec::new()
}

/// Coerce a field to a list of strings: scalars are wrapped, absent or
/// null becomes empty, null list elements are skipped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(scalar_to_string)
            .collect(),
        Some(other) => vec![scalar_to_string(other)],
    }
}

fn join_list(items: &[Value]) -> String {
    items
        .iter()
        .filter(|v| !v.is_null())
        .map(scalar_to_string)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// String form of a value: strings verbatim, everything else as JSON.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
