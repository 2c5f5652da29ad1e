// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Prometheus text exposition of row batches.
//!
//! Produces a flat list of sample lines:
//!
//! ```text
//! starlink_DownlinkThroughput{device_type="UserTerminal",device_id="ut01"} 12.5
//! starlink_alert{device_type="UserTerminal",device_id="ut01",alert="Thermal"} 1
//! starlink_info{device_type="UserTerminal",device_id="ut01",State="online"} 1
//! starlink_ip_addresses{device_id="abc123",family="ipv4"} 2
//! ```

use crate::rows::{AlertRow, IpAllocationRow, RowBatch, TelemetryRow};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::hash::Hash;

/// Default metric name prefix.
pub const DEFAULT_PREFIX: &str = "starlink";

/// Body served before the first batch has been rendered.
pub const PLACEHOLDER: &str = "# no telemetry collected yet";

/// Render a batch into exposition lines.
///
/// A batch may carry several samples per device. Only the newest one (by
/// `ts_ns`, later rows winning ties) is rendered, so every series appears
/// at most once.
pub fn render_batch(batch: &RowBatch, prefix: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(batch.len() * 4);
    let telemetry = latest_by(
        &batch.telemetry,
        |r| (r.device_type.as_str(), r.device_id.as_str()),
        |r| r.ts_ns,
    );
    for row in telemetry {
        render_telemetry(&mut lines, row, prefix);
    }
    for row in latest_alerts(&batch.alerts) {
        render_alert(&mut lines, row, prefix);
    }
    for row in latest_by(&batch.ip_allocations, |r| r.device_id.as_str(), |r| r.ts_ns) {
        render_ip_allocation(&mut lines, row, prefix);
    }
    lines
}

/// Newest row per key, in order of first appearance.
fn latest_by<'a, T, K>(
    rows: &'a [T],
    key: impl Fn(&'a T) -> K,
    ts: impl Fn(&T) -> u64,
) -> Vec<&'a T>
where
    K: Eq + Hash,
{
    let mut index: HashMap<K, usize> = HashMap::with_capacity(rows.len());
    let mut latest: Vec<&'a T> = Vec::with_capacity(rows.len());
    for row in rows {
        match index.entry(key(row)) {
            Entry::Occupied(slot) => {
                let current = &mut latest[*slot.get()];
                if ts(row) >= ts(*current) {
                    *current = row;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(latest.len());
                latest.push(row);
            }
        }
    }
    latest
}

/// Alerts of each device's newest sample, each alert name once.
fn latest_alerts(alerts: &[AlertRow]) -> Vec<&AlertRow> {
    let mut newest: HashMap<(&str, &str), u64> = HashMap::new();
    for alert in alerts {
        let ts = newest
            .entry((alert.device_type.as_str(), alert.device_id.as_str()))
            .or_insert(alert.ts_ns);
        *ts = (*ts).max(alert.ts_ns);
    }

    let mut seen = HashSet::new();
    let mut latest = Vec::new();
    for alert in alerts {
        let device = (alert.device_type.as_str(), alert.device_id.as_str());
        if newest.get(&device) == Some(&alert.ts_ns)
            && seen.insert((device, alert.alert_name.as_str()))
        {
            latest.push(alert);
        }
    }
    latest
}

fn render_telemetry(lines: &mut Vec<String>, row: &TelemetryRow, prefix: &str) {
    let base = [
        ("device_type", row.device_type.as_str()),
        ("device_id", row.device_id.as_str()),
    ];

    for (name, value) in &row.metrics {
        let metric = metric_name(&format!("{}_{}", prefix, name));
        lines.push(sample_line(&metric, &base, &format_value(*value)));
    }

    if !row.info.is_empty() {
        let mut labels: Vec<(String, &str)> =
            base.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        for (key, value) in &row.info {
            let key = label_name(key);
            if base.iter().any(|(k, _)| *k == key) {
                continue;
            }
            labels.push((key, value.as_str()));
        }
        let labels: Vec<(&str, &str)> = labels.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        lines.push(sample_line(
            &metric_name(&format!("{}_info", prefix)),
            &labels,
            "1",
        ));
    }
}

fn render_alert(lines: &mut Vec<String>, row: &AlertRow, prefix: &str) {
    lines.push(sample_line(
        &metric_name(&format!("{}_alert", prefix)),
        &[
            ("device_type", row.device_type.as_str()),
            ("device_id", row.device_id.as_str()),
            ("alert", row.alert_name.as_str()),
        ],
        "1",
    ));
}

fn render_ip_allocation(lines: &mut Vec<String>, row: &IpAllocationRow, prefix: &str) {
    let name = metric_name(&format!("{}_ip_addresses", prefix));
    for (family, addrs) in [
        ("ipv4", &row.ipv4),
        ("ipv6_ue", &row.ipv6_ue),
        ("ipv6_cpe", &row.ipv6_cpe),
    ] {
        lines.push(sample_line(
            &name,
            &[("device_id", row.device_id.as_str()), ("family", family)],
            &addrs.len().to_string(),
        ));
    }
}

fn sample_line(name: &str, labels: &[(&str, &str)], value: &str) -> String {
    let mut line = String::with_capacity(name.len() + 16 * labels.len() + value.len());
    line.push_str(name);
    if !labels.is_empty() {
        line.push('{');
        for (i, (key, val)) in labels.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}=\"{}\"", key, escape_label_value(val));
        }
        line.push('}');
    }
    line.push(' ');
    line.push_str(value);
    line
}

/// Restrict a metric name to `[A-Za-z0-9_:]`, never starting with a digit.
pub fn metric_name(raw: &str) -> String {
    sanitize(raw, |c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Restrict a label name to `[A-Za-z0-9_]`, never starting with a digit.
pub fn label_name(raw: &str) -> String {
    sanitize(raw, |c| c.is_ascii_alphanumeric() || c == '_')
}

fn sanitize(raw: &str, allowed: impl Fn(char) -> bool) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if allowed(c) { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Escape backslash, newline and double quote in a label value.
pub fn escape_label_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        v.to_string()
    }
}
