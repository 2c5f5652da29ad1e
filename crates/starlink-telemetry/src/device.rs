// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device type codes and well-known column names.

/// Column holding the device identifier.
pub const DEVICE_ID_FIELD: &str = "DeviceId";
/// Column holding the sample timestamp (Unix nanoseconds).
pub const TIMESTAMP_FIELD: &str = "UtcTimestampNs";
/// Column echoing the device type.
pub const DEVICE_TYPE_FIELD: &str = "DeviceType";

/// Alert-bearing columns, in lookup priority order.
pub const ALERT_FIELDS: [&str; 3] = ["Alerts", "ActiveAlerts", "ActiveAlertIds"];

/// IPv4 allocation column.
pub const IPV4_FIELD: &str = "Ipv4";
/// IPv6 user-equipment allocation column.
pub const IPV6_UE_FIELD: &str = "Ipv6Ue";
/// IPv6 customer-premises allocation column.
pub const IPV6_CPE_FIELD: &str = "Ipv6Cpe";

/// Synthetic prefix carried by IP-allocation device ids.
pub const IP_DEVICE_ID_PREFIX: &str = "ip-";

/// Classification of a device-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// End-user terminal (`u`); the only kind that emits alerts.
    UserTerminal,
    /// IP allocation record (`i`).
    IpAllocation,
    /// Router (`r`); discarded before decoding.
    Router,
    /// Any other code; decoded and classified generically.
    Other,
}

impl DeviceKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "u" => DeviceKind::UserTerminal,
            "i" => DeviceKind::IpAllocation,
            "r" => DeviceKind::Router,
            _ => DeviceKind::Other,
        }
    }
}

/// Whether a column is excluded from metric/info classification.
pub fn is_reserved_field(name: &str) -> bool {
    matches!(name, DEVICE_ID_FIELD | TIMESTAMP_FIELD | DEVICE_TYPE_FIELD)
        || ALERT_FIELDS.contains(&name)
}

/// Strip the synthetic `ip-` prefix from IP-allocation device ids.
///
/// Ids of other device kinds are returned unchanged.
pub fn normalize_device_id(kind: DeviceKind, device_id: &str) -> &str {
    match kind {
        DeviceKind::IpAllocation => device_id
            .strip_prefix(IP_DEVICE_ID_PREFIX)
            .unwrap_or(device_id),
        _ => device_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_code() {
        assert_eq!(DeviceKind::from_code("u"), DeviceKind::UserTerminal);
        assert_eq!(DeviceKind::from_code("i"), DeviceKind::IpAllocation);
        assert_eq!(DeviceKind::from_code("r"), DeviceKind::Router);
        assert_eq!(DeviceKind::from_code("U"), DeviceKind::Other);
    }

    #[test]
    fn test_reserved_fields() {
        assert!(is_reserved_field("DeviceId"));
        assert!(is_reserved_field("ActiveAlertIds"));
        assert!(!is_reserved_field("DownlinkThroughput"));
    }

    #[test]
    fn test_normalize_device_id() {
        assert_eq!(normalize_device_id(DeviceKind::IpAllocation, "ip-abc123"), "abc123");
        assert_eq!(normalize_device_id(DeviceKind::IpAllocation, "abc123"), "abc123");
        assert_eq!(normalize_device_id(DeviceKind::UserTerminal, "ip-abc123"), "ip-abc123");
    }
}
