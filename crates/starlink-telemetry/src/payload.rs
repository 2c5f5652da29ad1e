// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire types for the fleet telemetry API.
//!
//! Stream response shape:
//! ```text
//! {
//!   "data": {
//!     "values": [["u", "ut01", 1700000000000000000, ...], ...],
//!     "columnNamesByDeviceType": {"u": ["DeviceId", "UtcTimestampNs", ...]}
//!   },
//!   "metadata": {
//!     "enums": {
//!       "DeviceType": {"u": "UserTerminal"},
//!       "AlertsByDeviceType": {"u": {"100": "Thermal"}}
//!     }
//!   }
//! }
//! ```
//!
//! Every section is optional on the wire; missing sections decode as empty.

use crate::catalog::DeviceSchemaCatalog;
use crate::decoder::RawEntry;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Body of the telemetry stream request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    /// Target number of entries per response.
    pub batch_size: u32,
    /// Maximum time the upstream may hold the request open (ms).
    pub max_linger_ms: u64,
    /// Optional account scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
}

/// Credential exchange response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer token.
    pub access_token: String,
}

/// Successful stream response.
///
/// Sections are kept loosely typed so that one malformed row or layout
/// never fails the whole batch; [`StreamResponse::into_parts`] sorts out
/// what is usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: StreamData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: StreamMetadata,
}

/// Positional rows and the per-type column layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<RawEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub column_names_by_device_type: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enums: StreamEnums,
}

/// Naming catalogs shipped alongside each batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamEnums {
    #[serde(rename = "DeviceType", default, deserialize_with = "null_as_default")]
    pub device_type: HashMap<String, Value>,
    #[serde(
        rename = "AlertsByDeviceType",
        default,
        deserialize_with = "null_as_default"
    )]
    pub alerts_by_device_type: HashMap<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StreamResponse {
    /// Number of raw entries carried by this response.
    pub fn len(&self) -> usize {
        self.data.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.values.is_empty()
    }

    /// Split the response into its raw entries and the cycle's catalog.
    ///
    /// Layouts that are not a list of column names are left out of the
    /// catalog and counted as rejected; entries of that type then decode as
    /// unknown. Non-text display names are ignored.
    pub fn into_parts(self) -> (Vec<RawEntry>, DeviceSchemaCatalog) {
        let mut columns = HashMap::with_capacity(self.data.column_names_by_device_type.len());
        let mut rejected = 0;
        for (code, layout) in self.data.column_names_by_device_type {
            match column_list(&layout) {
                Some(cols) => {
                    columns.insert(code, cols);
                }
                None => {
                    tracing::debug!("ignoring malformed column layout for '{}': {}", code, layout);
                    rejected += 1;
                }
            }
        }

        let device_names = self
            .metadata
            .enums
            .device_type
            .into_iter()
            .filter_map(|(code, name)| Some((code, name_text(&name)?)))
            .collect();

        let alert_names = self
            .metadata
            .enums
            .alerts_by_device_type
            .into_iter()
            .filter_map(|(code, names)| {
                let names = names
                    .as_object()?
                    .iter()
                    .filter_map(|(alert, name)| Some((alert.clone(), name_text(name)?)))
                    .collect();
                Some((code, names))
            })
            .collect();

        let catalog = DeviceSchemaCatalog::new(columns, device_names, alert_names)
            .with_rejected_layouts(rejected);
        (self.data.values, catalog)
    }
}

/// A layout is usable only as a list of column-name strings.
fn column_list(layout: &Value) -> Option<Vec<String>> {
    layout
        .as_array()?
        .iter()
        .map(|col| col.as_str().map(str::to_string))
        .collect()
}

fn name_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_request_camel_case() {
        let req = StreamRequest {
            batch_size: 1000,
            max_linger_ms: 15_000,
            account_number: None,
        };
        let body = serde_json::to_value(&req).expect("serialize");
        assert_eq!(body, json!({"batchSize": 1000, "maxLingerMs": 15000}));

        let req = StreamRequest {
            account_number: Some("ACC-1".to_string()),
            ..req
        };
        let body = serde_json::to_value(&req).expect("serialize");
        assert_eq!(body["accountNumber"], "ACC-1");
    }

    #[test]
    fn test_stream_response_full() {
        let body = json!({
            "data": {
                "values": [["u", "ut01", 1, 2.5]],
                "columnNamesByDeviceType": {"u": ["DeviceId", "UtcTimestampNs", "Snr"]}
            },
            "metadata": {
                "enums": {
                    "DeviceType": {"u": "UserTerminal"},
                    "AlertsByDeviceType": {"u": {"100": "Thermal"}}
                }
            }
        });

        let resp: StreamResponse = serde_json::from_value(body).expect("parse");
        assert_eq!(resp.len(), 1);

        let (entries, catalog) = resp.into_parts();
        assert_eq!(entries[0][0], json!("u"));
        assert_eq!(catalog.rejected_layouts(), 0);
        assert_eq!(catalog.device_type_label("u"), "UserTerminal");
        assert_eq!(catalog.alert_name("u", "100"), "Thermal");
        assert_eq!(
            catalog.columns("u").expect("columns"),
            &["DeviceId", "UtcTimestampNs", "Snr"]
        );
    }

    #[test]
    fn test_stream_response_missing_sections() {
        let resp: StreamResponse = serde_json::from_value(json!({})).expect("parse");
        assert!(resp.is_empty());

        let (entries, catalog) = resp.into_parts();
        assert!(entries.is_empty());
        assert!(catalog.columns("u").is_none());
    }

    #[test]
    fn test_malformed_rows_and_layouts_keep_the_batch() {
        let body = br#"{
            "data": {
                "values": [null, ["u", "ut01", 1, 2.5], "junk", 7],
                "columnNamesByDeviceType": {
                    "u": ["DeviceId", "UtcTimestampNs", "Snr"],
                    "x": null,
                    "y": ["DeviceId", 3]
                }
            },
            "metadata": {
                "enums": {
                    "DeviceType": {"u": "UserTerminal", "x": null},
                    "AlertsByDeviceType": {"u": {"100": "Thermal", "101": null}, "x": null}
                }
            }
        }"#;

        let resp: StreamResponse = serde_json::from_slice(body).expect("parse");
        assert_eq!(resp.len(), 4);

        let (entries, catalog) = resp.into_parts();
        assert_eq!(entries.len(), 4);
        assert_eq!(catalog.rejected_layouts(), 2);
        assert!(catalog.columns("u").is_some());
        assert!(catalog.columns("x").is_none());
        assert!(catalog.columns("y").is_none());
        assert_eq!(catalog.device_type_label("u"), "UserTerminal");
        assert_eq!(catalog.device_type_label("x"), "x");
        assert_eq!(catalog.alert_name("u", "100"), "Thermal");
        assert_eq!(catalog.alert_name("u", "101"), "101");
    }

    #[test]
    fn test_null_sections() {
        let resp: StreamResponse = serde_json::from_value(json!({
            "data": {"values": null, "columnNamesByDeviceType": null},
            "metadata": null
        }))
        .expect("parse");
        assert!(resp.is_empty());
    }
}
