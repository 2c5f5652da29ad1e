// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bearer token exchange.
//!
//! Tokens are short-lived and their lifetime is not tracked: a token is
//! replaced whenever the stream endpoint stops accepting it.

use crate::error::AuthError;
use reqwest::Client;
use starlink_telemetry::TokenResponse;

/// OAuth client-credentials token holder.
#[derive(Debug, Clone)]
pub struct TokenManager {
    client: Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    token: Option<String>,
}

impl TokenManager {
    pub fn new(
        client: Client,
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: None,
        }
    }

    /// Current token, if one has been acquired.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Exchange the client credentials for a new token.
    pub async fn acquire(&mut self) -> Result<&str, AuthError> {
        let token = self.exchange().await?;
        Ok(self.token.insert(token).as_str())
    }

    /// Drop the current token and acquire a new one.
    ///
    /// The old token is gone even if the exchange fails.
    pub async fn refresh(&mut self) -> Result<&str, AuthError> {
        self.token = None;
        tracing::info!("Refreshing access token");
        self.acquire().await
    }

    async fn exchange(&self) -> Result<String, AuthError> {
        let response = self
            .client
            .post(&self.auth_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status, body });
        }

        let body: TokenResponse = response.json().await?;
        tracing::debug!("Access token acquired");
        Ok(body.access_token)
    }
}
