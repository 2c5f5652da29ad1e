// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Poll / decode / dispatch cycle.
//!
//! One cycle runs to completion, sink writes included, before the next
//! poll is issued. After a cycle the loop sleeps for whatever remains of
//! the cadence.

use crate::dispatch::SinkDispatcher;
use crate::error::{BridgeError, SinkError, StreamError};
use crate::poller::StreamPoller;
use crate::shutdown::Shutdown;
use starlink_telemetry::{build_rows, BuildStats};
use std::time::Duration;
use tokio::time::Instant;

/// Time left in the cadence after a cycle that took `elapsed`.
pub fn cadence_sleep(elapsed: Duration, cadence: Duration) -> Duration {
    cadence.saturating_sub(elapsed)
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Raw entries in the stream response.
    pub entries: usize,
    pub stats: BuildStats,
    pub telemetry_rows: usize,
    pub alert_rows: usize,
    pub ip_rows: usize,
    /// Sinks that accepted the batch.
    pub delivered: usize,
}

/// The telemetry bridge: one poller feeding one dispatcher.
pub struct Bridge {
    poller: StreamPoller,
    dispatcher: SinkDispatcher,
    cadence: Duration,
    shutdown: Shutdown,
}

impl Bridge {
    pub fn new(
        poller: StreamPoller,
        dispatcher: SinkDispatcher,
        cadence: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            poller,
            dispatcher,
            cadence,
            shutdown,
        }
    }

    /// Poll once, build rows and hand them to every sink.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, BridgeError> {
        let response = self.poller.poll().await?;
        let (entries, catalog) = response.into_parts();
        let (batch, stats) = build_rows(&entries, &catalog);

        let mut report = CycleReport {
            entries: entries.len(),
            stats,
            telemetry_rows: batch.telemetry.len(),
            alert_rows: batch.alerts.len(),
            ip_rows: batch.ip_allocations.len(),
            delivered: 0,
        };
        report.delivered = self.dispatcher.dispatch(batch).await?;
        Ok(report)
    }

    /// Run cycles until shutdown.
    pub async fn run(&mut self) -> Result<(), BridgeError> {
        tracing::info!(
            "Bridge running: cadence {:?}, sinks {:?}",
            self.cadence,
            self.dispatcher.names()
        );

        while self.shutdown.is_running() {
            let started = Instant::now();
            let report = match self.run_cycle().await {
                Ok(report) => report,
                Err(BridgeError::Stream(StreamError::Cancelled))
                | Err(BridgeError::Sink(SinkError::Cancelled)) => break,
                Err(e) => return Err(e),
            };

            if report.entries == 0 {
                tracing::debug!("Stream returned no entries, polling again");
                continue;
            }

            let elapsed = started.elapsed();
            let sleep = cadence_sleep(elapsed, self.cadence);
            log_cycle(&report, elapsed, sleep);

            if !self.shutdown.sleep(sleep).await {
                break;
            }
        }

        tracing::info!("Bridge stopped");
        Ok(())
    }
}

fn log_cycle(report: &CycleReport, elapsed: Duration, sleep: Duration) {
    let decode = &report.stats.decode;
    tracing::info!(
        "Cycle: {} entries, {} decoded, dropped {} empty / {} malformed / {} router / {} unknown type / {} missing key; \
         rows {} telemetry / {} alerts / {} ip; {} sinks; took {:?}, sleeping {:?}",
        report.entries,
        decode.decoded,
        decode.empty,
        decode.malformed,
        decode.router,
        decode.unknown_type,
        report.stats.missing_key,
        report.telemetry_rows,
        report.alert_rows,
        report.ip_rows,
        report.delivered,
        elapsed,
        sleep
    );
    if decode.rejected_layouts > 0 {
        tracing::warn!(
            "Ignored {} malformed column layouts this cycle",
            decode.rejected_layouts
        );
    }
}
