// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration.
//!
//! Every setting is a command-line flag backed by an environment variable,
//! so a plain `.env` file is enough to run the bridge.

use crate::sinks::clickhouse::ClickHouseConfig;
use crate::sinks::influx::InfluxConfig;
use clap::{Parser, ValueEnum};
use starlink_telemetry::exposition::DEFAULT_PREFIX;
use starlink_telemetry::StreamRequest;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Default token endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://api.starlink.com/auth/connect/token";
/// Default telemetry stream endpoint.
pub const DEFAULT_STREAM_URL: &str = "https://starlink.com/api/public/v2/telemetry/stream";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Downstream store selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SinkKind {
    /// Bulk JSONEachRow inserts into ClickHouse.
    Clickhouse,
    /// Line protocol point writes into InfluxDB v2.
    Influxdb,
    /// Prometheus pull endpoint.
    Prometheus,
}

/// Starlink telemetry bridge
#[derive(Parser, Debug, Clone)]
#[command(name = "starlink-bridge")]
#[command(about = "Polls the Starlink telemetry stream and republishes it to downstream stores")]
#[command(version)]
pub struct BridgeConfig {
    /// OAuth client id
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Token endpoint
    #[arg(long, env = "AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    /// Telemetry stream endpoint
    #[arg(long, env = "STREAM_URL", default_value = DEFAULT_STREAM_URL)]
    pub stream_url: String,

    /// Account number to restrict the stream to
    #[arg(long, env = "ACCOUNT_NUMBER")]
    pub account_number: Option<String>,

    /// Target number of entries per poll
    #[arg(long, env = "BATCH_SIZE", default_value = "1000")]
    pub batch_size: u32,

    /// Maximum time the stream may linger before answering (ms)
    #[arg(long, env = "MAX_LINGER", default_value = "15000")]
    pub max_linger: u64,

    /// Cycle cadence (seconds)
    #[arg(long, env = "CADENCE_SECS", default_value = "15")]
    pub cadence_secs: u64,

    /// Enabled sinks (comma-separated)
    #[arg(
        long,
        env = "SINKS",
        value_enum,
        value_delimiter = ',',
        default_value = "clickhouse"
    )]
    pub sinks: Vec<SinkKind>,

    /// ClickHouse HTTP interface URL
    #[arg(long, env = "CLICKHOUSE_URL")]
    pub clickhouse_url: Option<String>,

    /// ClickHouse user
    #[arg(long, env = "CLICKHOUSE_USER", default_value = "default")]
    pub clickhouse_user: String,

    /// ClickHouse password
    #[arg(long, env = "CLICKHOUSE_PASSWORD", default_value = "", hide_env_values = true)]
    pub clickhouse_password: String,

    /// ClickHouse database
    #[arg(long, env = "CLICKHOUSE_DB", default_value = "default")]
    pub clickhouse_db: String,

    /// InfluxDB base URL
    #[arg(long, env = "INFLUX_URL")]
    pub influx_url: Option<String>,

    /// InfluxDB organization
    #[arg(long, env = "INFLUX_ORG")]
    pub influx_org: Option<String>,

    /// InfluxDB bucket
    #[arg(long, env = "INFLUX_BUCKET")]
    pub influx_bucket: Option<String>,

    /// InfluxDB API token
    #[arg(long, env = "INFLUX_TOKEN", hide_env_values = true)]
    pub influx_token: Option<String>,

    /// Bind address of the metrics endpoint
    #[arg(long, env = "METRICS_BIND", default_value = "0.0.0.0")]
    pub metrics_bind: IpAddr,

    /// Port of the metrics endpoint
    #[arg(long, env = "METRICS_PORT", default_value = "9100")]
    pub metrics_port: u16,

    /// Metric name prefix
    #[arg(long, env = "METRICS_PREFIX", default_value = DEFAULT_PREFIX)]
    pub metrics_prefix: String,

    /// Per-request timeout for sink writes (seconds)
    #[arg(long, env = "SINK_TIMEOUT_SECS", default_value = "20")]
    pub sink_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl BridgeConfig {
    /// Check the configuration as a whole.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;

        if self.sinks.is_empty() {
            return Err(ConfigError::Invalid("no sink enabled".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("BATCH_SIZE must be positive".into()));
        }
        if self.cadence_secs == 0 {
            return Err(ConfigError::Invalid("CADENCE_SECS must be positive".into()));
        }

        check_url("AUTH_URL", &self.auth_url)?;
        check_url("STREAM_URL", &self.stream_url)?;

        if self.is_enabled(SinkKind::Clickhouse) {
            self.clickhouse()?;
        }
        if self.is_enabled(SinkKind::Influxdb) {
            self.influx()?;
        }
        if self.is_enabled(SinkKind::Prometheus) && self.metrics_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("METRICS_PREFIX must not be empty".into()));
        }

        Ok(())
    }

    pub fn is_enabled(&self, kind: SinkKind) -> bool {
        self.sinks.contains(&kind)
    }

    /// Client id and secret.
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let id = non_empty(&self.client_id).ok_or(ConfigError::Missing("CLIENT_ID"))?;
        let secret = non_empty(&self.client_secret).ok_or(ConfigError::Missing("CLIENT_SECRET"))?;
        Ok((id, secret))
    }

    /// Body of every stream request.
    pub fn stream_request(&self) -> StreamRequest {
        StreamRequest {
            batch_size: self.batch_size,
            max_linger_ms: self.max_linger,
            account_number: self.account_number.clone().filter(|a| !a.is_empty()),
        }
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    /// Timeout for token and stream calls: the linger window plus slack
    /// for the round trip.
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.max_linger) + Duration::from_secs(30)
    }

    pub fn clickhouse(&self) -> Result<ClickHouseConfig, ConfigError> {
        let url = non_empty(&self.clickhouse_url).ok_or(ConfigError::Missing("CLICKHOUSE_URL"))?;
        check_url("CLICKHOUSE_URL", url)?;
        Ok(ClickHouseConfig {
            url: url.trim_end_matches('/').to_string(),
            user: self.clickhouse_user.clone(),
            password: self.clickhouse_password.clone(),
            database: self.clickhouse_db.clone(),
        })
    }

    pub fn influx(&self) -> Result<InfluxConfig, ConfigError> {
        let url = non_empty(&self.influx_url).ok_or(ConfigError::Missing("INFLUX_URL"))?;
        check_url("INFLUX_URL", url)?;
        Ok(InfluxConfig {
            url: url.trim_end_matches('/').to_string(),
            org: non_empty(&self.influx_org)
                .ok_or(ConfigError::Missing("INFLUX_ORG"))?
                .to_string(),
            bucket: non_empty(&self.influx_bucket)
                .ok_or(ConfigError::Missing("INFLUX_BUCKET"))?
                .to_string(),
            token: non_empty(&self.influx_token)
                .ok_or(ConfigError::Missing("INFLUX_TOKEN"))?
                .to_string(),
        })
    }

    /// Socket address of the metrics endpoint.
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::new(self.metrics_bind, self.metrics_port)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_url(var: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be an http(s) URL, got '{}'",
            var, url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> BridgeConfig {
        let mut args = vec![
            "starlink-bridge",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--clickhouse-url",
            "http://localhost:8123/",
        ];
        args.extend_from_slice(extra);
        BridgeConfig::try_parse_from(args).expect("parse args")
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        config.validate().expect("valid");

        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.max_linger, 15_000);
        assert_eq!(config.cadence(), Duration::from_secs(15));
        assert_eq!(config.sink_timeout(), Duration::from_secs(20));
        assert_eq!(config.sinks, vec![SinkKind::Clickhouse]);
        assert_eq!(config.metrics_port, 9100);

        let ch = config.clickhouse().expect("clickhouse");
        assert_eq!(ch.url, "http://localhost:8123");
        assert_eq!(ch.user, "default");
        assert_eq!(ch.database, "default");
    }

    #[test]
    fn test_sink_list() {
        let config = parse(&["--sinks", "prometheus,influxdb"]);
        assert!(config.is_enabled(SinkKind::Prometheus));
        assert!(config.is_enabled(SinkKind::Influxdb));
        assert!(!config.is_enabled(SinkKind::Clickhouse));

        match config.validate() {
            Err(ConfigError::Missing(var)) => assert_eq!(var, "INFLUX_URL"),
            other => panic!("expected missing INFLUX_URL, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = parse(&[]);
        config.client_secret = Some("  ".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("CLIENT_SECRET"))
        ));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = parse(&[]);
        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = parse(&[]);
        config.stream_url = "ftp://example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = parse(&["--sinks", "prometheus"]);
        config.metrics_prefix = " ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let args = [
            "starlink-bridge",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--metrics-bind",
            "not an address",
        ];
        assert!(BridgeConfig::try_parse_from(args).is_err());
    }

    #[test]
    fn test_metrics_addr() {
        let config = parse(&["--sinks", "prometheus"]);
        assert_eq!(config.metrics_prefix, DEFAULT_PREFIX);
        assert_eq!(config.metrics_addr().to_string(), "0.0.0.0:9100");

        let config = parse(&[
            "--sinks",
            "prometheus",
            "--metrics-bind",
            "::",
            "--metrics-port",
            "9200",
        ]);
        config.validate().expect("valid");
        assert_eq!(config.metrics_addr().to_string(), "[::]:9200");
    }

    #[test]
    fn test_stream_request_account() {
        let config = parse(&["--account-number", "ACC-42"]);
        let req = config.stream_request();
        assert_eq!(req.batch_size, 1000);
        assert_eq!(req.account_number.as_deref(), Some("ACC-42"));
    }
}
