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

//! # Amadeus Configuration
//!
//! Credentials, endpoint and timeouts, read from the environment.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

pub const ENV_CLIENT_ID: &str = "AMADEUS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AMADEUS_CLIENT_SECRET";
pub const ENV_BASE_URL: &str = "AMADEUS_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(25);

/// Connection settings for the Amadeus Self-Service API.
///
/// Missing credentials are not rejected here: the authenticator reports them
/// as a configuration error on first use, before any network call.
#[derive(Debug)]
pub struct AmadeusConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub base_url: String,
    pub token_timeout: Duration,
    pub search_timeout: Duration,
}

impl AmadeusConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into().trim().to_string(),
            client_secret: SecretString::from(client_secret.into().trim().to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_timeout: TOKEN_TIMEOUT,
            search_timeout: SEARCH_TIMEOUT,
        }
    }

    /// Read `AMADEUS_CLIENT_ID`, `AMADEUS_CLIENT_SECRET` and `AMADEUS_BASE_URL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AmadeusConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::new(
            lookup(ENV_CLIENT_ID).unwrap_or_default(),
            lookup(ENV_CLIENT_SECRET).unwrap_or_default(),
        );
        match lookup(ENV_BASE_URL) {
            Some(url) if !url.trim().is_empty() => config.with_base_url(url),
            _ => config,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, token_timeout: Duration, search_timeout: Duration) -> Self {
        self.token_timeout = token_timeout;
        self.search_timeout = search_timeout;
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.expose_secret().is_empty()
    }

    pub fn token_url(&self) -> String {
        format!("{}/v1/security/oauth2/token", self.base_url)
    }

    pub fn flight_offers_url(&self) -> String {
        format!("{}/v2/shopping/flight-offers", self.base_url)
    }
}
