// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry stream polling.
//!
//! The poller alternates between two states:
//!
//! ```text
//!          non-success status
//! Requesting ----------------> BackoffRefresh
//!     ^                              |
//!     +------ token refreshed -------+
//! ```
//!
//! A success response leaves the loop. Transport failures stay in
//! `Requesting` behind an exponential backoff. The first rejection in a row
//! refreshes the token right away; further consecutive rejections back off
//! before refreshing.

use crate::error::StreamError;
use crate::retry::{Backoff, RetryConfig};
use crate::shutdown::Shutdown;
use crate::token::TokenManager;
use reqwest::Client;
use starlink_telemetry::{StreamRequest, StreamResponse};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Requesting,
    BackoffRefresh,
}

/// Issues stream requests until one succeeds.
#[derive(Debug)]
pub struct StreamPoller {
    client: Client,
    stream_url: String,
    request: StreamRequest,
    tokens: TokenManager,
    retry: RetryConfig,
    shutdown: Shutdown,
}

impl StreamPoller {
    pub fn new(
        client: Client,
        stream_url: impl Into<String>,
        request: StreamRequest,
        tokens: TokenManager,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            client,
            stream_url: stream_url.into(),
            request,
            tokens,
            retry: RetryConfig::default(),
            shutdown,
        }
    }

    /// Override the backoff used for transport failures and repeated
    /// rejections.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Poll until the stream answers with a success response.
    ///
    /// Returns `StreamError::Cancelled` once the shutdown handle is stopped.
    pub async fn poll(&mut self) -> Result<StreamResponse, StreamError> {
        let mut backoff = Backoff::new(self.retry);
        let mut rejections = 0u32;
        let mut state = PollState::Requesting;

        loop {
            if !self.shutdown.is_running() {
                return Err(StreamError::Cancelled);
            }

            state = match state {
                PollState::Requesting => match self.tokens.token() {
                    None => {
                        tracing::debug!("No access token held, refreshing");
                        PollState::BackoffRefresh
                    }
                    Some(token) => match self.request_once(token).await {
                        Ok(response) => return Ok(response),
                        Err(StreamError::Rejected(status)) => {
                            tracing::warn!(
                                "Stream rejected request with status {}, refreshing token",
                                status
                            );
                            PollState::BackoffRefresh
                        }
                        Err(e) => {
                            let delay = backoff.next_delay();
                            tracing::warn!("Stream request failed: {}; retrying in {:?}", e, delay);
                            self.pause(delay).await?;
                            PollState::Requesting
                        }
                    },
                },
                PollState::BackoffRefresh => {
                    if rejections > 0 {
                        let delay = backoff.next_delay();
                        self.pause(delay).await?;
                    }
                    rejections += 1;

                    if let Err(e) = self.tokens.refresh().await {
                        tracing::warn!("Token refresh failed: {}", e);
                    }
                    PollState::Requesting
                }
            };
        }
    }

    async fn request_once(&self, token: &str) -> Result<StreamResponse, StreamError> {
        let response = self
            .client
            .post(&self.stream_url)
            .bearer_auth(token)
            .json(&self.request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StreamError::Rejected(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn pause(&self, delay: Duration) -> Result<(), StreamError> {
        if self.shutdown.sleep(delay).await {
            Ok(())
        } else {
            Err(StreamError::Cancelled)
        }
    }
}
