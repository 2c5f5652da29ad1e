// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-cycle device schema and naming catalog.
//!
//! The upstream ships the column layout and the display names with every
//! batch, so a catalog lives for exactly one poll cycle.

use std::collections::HashMap;

/// Column layout and display names for one poll cycle.
#[derive(Debug, Clone, Default)]
pub struct DeviceSchemaCatalog {
    columns_by_type: HashMap<String, Vec<String>>,
    device_type_names: HashMap<String, String>,
    alerts_by_type: HashMap<String, HashMap<String, String>>,
    rejected_layouts: usize,
}

impl DeviceSchemaCatalog {
    pub fn new(
        columns_by_type: HashMap<String, Vec<String>>,
        device_type_names: HashMap<String, String>,
        alerts_by_type: HashMap<String, HashMap<String, String>>,
    ) -> Self {
        Self {
            columns_by_type,
            device_type_names,
            alerts_by_type,
            rejected_layouts: 0,
        }
    }

    /// Record how many wire layouts were unusable this cycle.
    pub fn with_rejected_layouts(mut self, count: usize) -> Self {
        self.rejected_layouts = count;
        self
    }

    /// Register (or replace) the column layout of a device type.
    pub fn with_columns<I, S>(mut self, code: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_by_type.insert(
            code.to_string(),
            columns.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Register the display name of a device type.
    pub fn with_device_type_name(mut self, code: &str, name: &str) -> Self {
        self.device_type_names
            .insert(code.to_string(), name.to_string());
        self
    }

    /// Register the display name of an alert code for a device type.
    pub fn with_alert_name(mut self, code: &str, alert_code: &str, name: &str) -> Self {
        self.alerts_by_type
            .entry(code.to_string())
            .or_default()
            .insert(alert_code.to_string(), name.to_string());
        self
    }

    /// Ordered column names for a device type.
    ///
    /// An empty layout is reported as `None`: it cannot decode anything.
    pub fn columns(&self, code: &str) -> Option<&[String]> {
        self.columns_by_type
            .get(code)
            .filter(|cols| !cols.is_empty())
            .map(Vec::as_slice)
    }

    /// Display label for a device type, falling back to the raw code.
    pub fn device_type_label<'a>(&'a self, code: &'a str) -> &'a str {
        self.device_type_names
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }

    /// Display name for an alert code, falling back to the raw alert code.
    pub fn alert_name<'a>(&'a self, code: &str, alert_code: &'a str) -> &'a str {
        self.alerts_by_type
            .get(code)
            .and_then(|names| names.get(alert_code))
            .map(String::as_str)
            .unwrap_or(alert_code)
    }

    /// Layouts dropped while building the catalog.
    pub fn rejected_layouts(&self) -> usize {
        self.rejected_layouts
    }

    /// Number of device types with a registered layout.
    pub fn schema_count(&self) -> usize {
        self.columns_by_type.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_fallback_to_code() {
        let catalog = DeviceSchemaCatalog::default().with_device_type_name("u", "UserTerminal");
        assert_eq!(catalog.device_type_label("u"), "UserTerminal");
        assert_eq!(catalog.device_type_label("x"), "x");
    }

    #[test]
    fn test_alert_name_fallback_to_code() {
        let catalog = DeviceSchemaCatalog::default()
            .with_alert_name("u", "100", "Thermal")
            .with_alert_name("r", "999", "RouterOnly");

        assert_eq!(catalog.alert_name("u", "100"), "Thermal");
        assert_eq!(catalog.alert_name("u", "999"), "999");
        assert_eq!(catalog.alert_name("i", "100"), "100");
    }

    #[test]
    fn test_empty_layout_is_unknown() {
        let catalog = DeviceSchemaCatalog::default()
            .with_columns("u", ["DeviceId"])
            .with_columns("i", Vec::<String>::new());

        assert!(catalog.columns("u").is_some());
        assert!(catalog.columns("i").is_none());
        assert!(catalog.columns("z").is_none());
        assert_eq!(catalog.schema_count(), 2);
    }
}
