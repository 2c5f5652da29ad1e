// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ClickHouse bulk insert sink.
//!
//! Talks to the ClickHouse HTTP interface: statements go in the `query`
//! parameter, row data in the request body as `JSONEachRow`.

use crate::dispatch::Sink;
use crate::error::SinkError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use starlink_telemetry::{RowBatch, TelemetryRow};
use std::time::Duration;

/// Table names inside the configured database.
pub const TELEMETRY_TABLE: &str = "telemetry";
pub const ALERTS_TABLE: &str = "alerts";
pub const IP_ALLOCATIONS_TABLE: &str = "ip_allocations";

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseConfig {
    /// HTTP interface URL, without trailing slash.
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Writes each row group as one `INSERT ... FORMAT JSONEachRow` request.
#[derive(Debug, Clone)]
pub struct ClickHouseSink {
    client: Client,
    config: ClickHouseConfig,
}

impl ClickHouseSink {
    pub fn new(config: ClickHouseConfig, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create the three tables if they do not exist yet.
    pub async fn ensure_tables(&self) -> Result<(), SinkError> {
        for ddl in table_ddl(&self.config.database) {
            self.execute(&ddl, None).await?;
        }
        tracing::info!("ClickHouse tables ready in database '{}'", self.config.database);
        Ok(())
    }

    /// Insert rows into `table`; a no-op for an empty slice.
    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let query = format!(
            "INSERT INTO {}.{} FORMAT JSONEachRow",
            self.config.database, table
        );
        self.execute(&query, Some(encode_json_each_row(rows)?)).await
    }

    async fn execute(&self, query: &str, body: Option<String>) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .query(&[("query", query)])
            .basic_auth(&self.config.user, Some(&self.config.password));
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                sink: "clickhouse",
                status,
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for ClickHouseSink {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    async fn export(&self, batch: &RowBatch) -> Result<(), SinkError> {
        let telemetry: Vec<TelemetryRow> = batch.telemetry.iter().map(finite_metrics).collect();
        self.insert(TELEMETRY_TABLE, &telemetry).await?;
        self.insert(ALERTS_TABLE, &batch.alerts).await?;
        self.insert(IP_ALLOCATIONS_TABLE, &batch.ip_allocations)
            .await
    }
}

/// `CREATE TABLE` statements for the telemetry, alerts and IP tables.
pub fn table_ddl(database: &str) -> [String; 3] {
    [
        format!(
            "CREATE TABLE IF NOT EXISTS {db}.{table} \
             (device_type String, device_id String, ts_ns UInt64, \
             metrics Map(String, Float64), info Map(String, String)) \
             ENGINE = MergeTree ORDER BY (device_id, ts_ns)",
            db = database,
            table = TELEMETRY_TABLE
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {db}.{table} \
             (device_type String, device_id String, ts_ns UInt64, alert_name String) \
             ENGINE = MergeTree ORDER BY (device_id, ts_ns)",
            db = database,
            table = ALERTS_TABLE
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {db}.{table} \
             (device_id String, ts_ns UInt64, ipv4 Array(String), \
             ipv6_ue Array(String), ipv6_cpe Array(String)) \
             ENGINE = MergeTree ORDER BY (device_id, ts_ns)",
            db = database,
            table = IP_ALLOCATIONS_TABLE
        ),
    ]
}

/// One JSON object per row, newline separated.
pub fn encode_json_each_row<T: Serialize>(rows: &[T]) -> Result<String, serde_json::Error> {
    let lines = rows
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

/// Float64 map values cannot hold JSON `null`, so non-finite metrics are
/// left out of the insert.
fn finite_metrics(row: &TelemetryRow) -> TelemetryRow {
    let mut row = row.clone();
    row.metrics.retain(|_, v| v.is_finite());
    row
}
