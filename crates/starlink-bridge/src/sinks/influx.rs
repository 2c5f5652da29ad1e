// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB v2 point write sink.

use crate::dispatch::Sink;
use crate::error::SinkError;
use async_trait::async_trait;
use reqwest::Client;
use starlink_telemetry::line_protocol::encode_batch;
use starlink_telemetry::RowBatch;
use std::time::Duration;

/// Write API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    /// Base URL, without trailing slash.
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

/// Posts one line protocol point per row to `/api/v2/write`.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    config: InfluxConfig,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.config.url)
    }
}

#[async_trait]
impl Sink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn export(&self, batch: &RowBatch) -> Result<(), SinkError> {
        let lines = encode_batch(batch);
        if lines.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.write_url())
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(lines.join("\n"))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                sink: "influxdb",
                status,
                body,
            });
        }
        tracing::debug!("Wrote {} points to bucket '{}'", lines.len(), self.config.bucket);
        Ok(())
    }
}
