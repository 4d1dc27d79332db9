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

//! # Amadeus Flight Offers Client
//!
//! Effectful (network) half of the search: one authenticated GET per call.

use crate::config::AmadeusConfig;
use crate::error::{FlightSearchError, body_preview, describe_transport_error};
use crate::offers_query_builder::encode_query;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AmadeusOffersClient {
    client: Arc<wreq::Client>,
    config: Arc<AmadeusConfig>,
}

impl AmadeusOffersClient {
    pub fn new(config: Arc<AmadeusConfig>) -> Result<Self, FlightSearchError> {
        let client = wreq::Client::builder()
            .timeout(config.search_timeout)
            .connect_timeout(config.search_timeout)
            .build()
            .map_err(|e| {
                FlightSearchError::upstream(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Full search URL for the given provider parameters
    pub fn search_url(&self, params: &[(&'static str, String)]) -> String {
        format!("{}?{}", self.config.flight_offers_url(), encode_query(params))
    }

    /// Issue the search and return the raw response body.
    ///
    /// Non-2xx responses, transport failures and timeouts become
    /// [`FlightSearchError::Upstream`]; nothing is retried.
    pub async fn fetch_raw(
        &self,
        params: &[(&'static str, String)],
        token: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FlightSearchError> {
        let url = self.search_url(params);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("[fetch_raw] cancelled before completion");
                Err(FlightSearchError::Cancelled)
            }
            result = self.send(&url, token) => result,
        }
    }

    async fn send(&self, url: &str, token: &SecretString) -> Result<Vec<u8>, FlightSearchError> {
        let http_start = std::time::Instant::now();
        tracing::trace!("[fetch_raw] Starting HTTP request to: {}", url);
        let bearer = format!("Bearer {}", token.expose_secret());
        let response = self
            .client
            .get(url)
            .header("Authorization", &bearer)
            .header("Accept", "application/vnd.amadeus+json, application/json")
            .send()
            .await
            .map_err(|e| FlightSearchError::upstream(describe_transport_error(&e)))?;

        let status = response.status();
        tracing::debug!(
            "[fetch_raw] HTTP Status: {} {} after {:?}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            http_start.elapsed()
        );

        let body_start = std::time::Instant::now();
        let body = response
            .bytes()
            .await
            .map_err(|e| FlightSearchError::upstream(describe_transport_error(&e)))?;
        tracing::debug!(
            "[fetch_raw] Response body read in {:?}: {} KB",
            body_start.elapsed(),
            body.len() / 1024
        );

        if !status.is_success() {
            return Err(FlightSearchError::Upstream {
                status: Some(status.as_u16()),
                message: body_preview(&body),
            });
        }

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offers_query_builder::SearchRequest;
    use chrono::NaiveDate;

    #[test]
    fn test_search_url() {
        let config = AmadeusConfig::new("id", "secret").with_base_url("http://localhost:9999/");
        let client = AmadeusOffersClient::new(Arc::new(config)).unwrap();
        let request = SearchRequest::builder(
            "CDG",
            "JFK",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )
        .currency("EUR")
        .build()
        .unwrap();

        assert_eq!(
            client.search_url(&request.provider_params()),
            "http://localhost:9999/v2/shopping/flight-offers?originLocationCode=CDG&destinationLocationCode=JFK&departureDate=2024-05-01&adults=1&currencyCode=EUR&nonStop=false"
        );
    }
}
