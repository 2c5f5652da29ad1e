// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types.

use thiserror::Error;

/// Token exchange failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Telemetry stream failures.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any non-success status; the token is refreshed before the next try.
    #[error("Stream request rejected with status {0}")]
    Rejected(u16),

    #[error("Malformed stream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stream polling cancelled")]
    Cancelled,
}

/// Sink write failures.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{sink} returned status {status}: {body}")]
    Status {
        sink: &'static str,
        status: u16,
        body: String,
    },

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Export cancelled")]
    Cancelled,
}

/// Errors ending a bridge cycle.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}
