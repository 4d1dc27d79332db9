//!  Delulu Travel Agent
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Amadeus Authentication
//!
//! OAuth2 client-credentials exchange, amortized through a shared token cache.

use crate::config::{AmadeusConfig, ENV_CLIENT_ID, ENV_CLIENT_SECRET};
use crate::error::{FlightSearchError, body_preview, describe_transport_error};
use crate::offers_query_builder::encode_pairs;
use delulu_token_cache::{Clock, IssuedToken, SystemClock, TokenCache};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct AmadeusAuthenticator<C = SystemClock> {
    client: Arc<wreq::Client>,
    config: Arc<AmadeusConfig>,
    cache: TokenCache<C>,
}

impl AmadeusAuthenticator<SystemClock> {
    pub fn new(config: Arc<AmadeusConfig>) -> Result<Self, FlightSearchError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AmadeusAuthenticator<C> {
    pub fn with_clock(config: Arc<AmadeusConfig>, clock: C) -> Result<Self, FlightSearchError> {
        let client = wreq::Client::builder()
            .timeout(config.token_timeout)
            .connect_timeout(config.token_timeout)
            .build()
            .map_err(|e| FlightSearchError::auth(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client: Arc::new(client),
            config,
            cache: TokenCache::new(clock),
        })
    }

    /// A bearer token valid for at least the cache's refresh margin.
    ///
    /// Missing credentials fail before any network call. Cancellation drops
    /// the in-flight exchange without touching the cached token.
    pub async fn access_token(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<SecretString>, FlightSearchError> {
        if !self.config.has_credentials() {
            return Err(FlightSearchError::Configuration(format!(
                "{} or {}",
                ENV_CLIENT_ID, ENV_CLIENT_SECRET
            )));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FlightSearchError::Cancelled),
            token = self.cache.get_or_refresh(|| self.request_token()) => token,
        }
    }

    /// Number of token exchanges started so far
    pub fn exchange_count(&self) -> u64 {
        self.cache.exchange_count()
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    /// Drop `rejected` from the cache unless another caller already replaced it
    pub async fn invalidate_token(&self, rejected: &Arc<SecretString>) -> bool {
        self.cache.invalidate_if_current(rejected).await
    }

    async fn request_token(&self) -> Result<IssuedToken, FlightSearchError> {
        let url = self.config.token_url();
        let form = encode_pairs([
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ]);

        let start = std::time::Instant::now();
        tracing::debug!("[token] POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(form)
            .send()
            .await
            .map_err(|e| FlightSearchError::auth(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FlightSearchError::auth(describe_transport_error(&e)))?;
        tracing::debug!(
            "[token] HTTP {} after {:?}",
            status.as_u16(),
            start.elapsed()
        );

        if !status.is_success() {
            return Err(FlightSearchError::Auth {
                status: Some(status.as_u16()),
                message: body_preview(&body),
            });
        }

        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| FlightSearchError::auth(format!("malformed token response: {}", e)))?;

        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FlightSearchError::auth("token response missing access_token"))?;

        tracing::info!(
            "Obtained Amadeus access token (expires_in={:?})",
            parsed.expires_in
        );
        Ok(IssuedToken {
            access_token: SecretString::from(access_token),
            expires_in: parsed.expires_in,
        })
    }
}
