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

//! # Flight Search Tool
//!
//! Entry point for workflows: arguments in, `{query, results, source}` out.

use crate::amadeus_auth::AmadeusAuthenticator;
use crate::config::AmadeusConfig;
use crate::error::FlightSearchError;
use crate::offers_query_builder::{FlightSearchArgs, SearchRequest, build_query};
use crate::offers_results_parser::{FlightOffer, parse_offers_response};
use crate::offers_search::AmadeusOffersClient;
use delulu_token_cache::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const TOOL_NAME: &str = "flight_search";
pub const TOOL_DESCRIPTION: &str =
    "Search for flights using origin, destination, dates, and preferences (Amadeus API).";
pub const SOURCE: &str = "amadeus";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub results: Vec<FlightOffer>,
    pub source: String,
}

/// Success/failure envelope handed back to the calling workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Serialized [`SearchResult`] on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    fn ok(content: String) -> Self {
        Self {
            success: true,
            content: Some(content),
            error: None,
        }
    }

    fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.to_string()),
        }
    }
}

pub struct FlightSearchTool<C = SystemClock> {
    auth: AmadeusAuthenticator<C>,
    offers: AmadeusOffersClient,
}

impl FlightSearchTool<SystemClock> {
    pub fn new(config: AmadeusConfig) -> Result<Self, FlightSearchError> {
        Self::with_clock(config, SystemClock)
    }

    /// Build from `AMADEUS_*` environment variables
    pub fn from_env() -> Result<Self, FlightSearchError> {
        Self::new(AmadeusConfig::from_env())
    }
}

impl<C: Clock> FlightSearchTool<C> {
    pub fn with_clock(config: AmadeusConfig, clock: C) -> Result<Self, FlightSearchError> {
        let config = Arc::new(config);
        Ok(Self {
            auth: AmadeusAuthenticator::with_clock(Arc::clone(&config), clock)?,
            offers: AmadeusOffersClient::new(config)?,
        })
    }

    pub fn name(&self) -> &'static str {
        TOOL_NAME
    }

    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// JSON Schema of the accepted arguments
    pub fn json_schema(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(FlightSearchArgs)).unwrap_or_default()
    }

    pub fn authenticator(&self) -> &AmadeusAuthenticator<C> {
        &self.auth
    }

    /// Run the tool on a raw argument object and wrap the outcome in an envelope
    pub async fn execute(&self, args: serde_json::Value, cancel: &CancellationToken) -> ToolResult {
        let outcome = match self.run(args, cancel).await {
            Ok(result) => serde_json::to_string(&result).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match outcome {
            Ok(content) => ToolResult::ok(content),
            Err(e) => {
                tracing::warn!("{} failed: {}", TOOL_NAME, e);
                ToolResult::failure(e)
            }
        }
    }

    /// Parse raw arguments, then [`FlightSearchTool::search`]
    pub async fn run(
        &self,
        args: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, FlightSearchError> {
        let args: FlightSearchArgs = serde_json::from_value(args)
            .map_err(|e| FlightSearchError::InvalidArguments(e.to_string()))?;
        let request = SearchRequest::try_from(args)?;
        self.search(&request, cancel).await
    }

    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, FlightSearchError> {
        let overall_start = std::time::Instant::now();
        let (query, params) = build_query(request);
        tracing::info!("Searching flight offers: {}", query);

        let token = self.auth.access_token(cancel).await?;

        let body = match self.offers.fetch_raw(&params, &token, cancel).await {
            Ok(body) => body,
            Err(e) => {
                if e.status() == Some(401) && self.auth.invalidate_token(&token).await {
                    tracing::warn!("Search rejected our token, dropped it from the cache");
                }
                return Err(e);
            }
        };

        let parsed = parse_offers_response(&body)?;
        tracing::info!(
            "Found {} offer(s), skipped {}, in {:?}",
            parsed.offers.len(),
            parsed.skipped,
            overall_start.elapsed()
        );

        Ok(SearchResult {
            query,
            results: parsed.offers,
            source: SOURCE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_shape() {
        let tool = FlightSearchTool::new(AmadeusConfig::new("", "")).unwrap();
        let schema = tool.json_schema();

        assert_eq!(schema["type"], "object");
        let properties = schema["properties"].as_object().unwrap();
        for key in [
            "origin",
            "destination",
            "depart_date",
            "return_date",
            "passengers",
            "cabin",
            "max_price",
            "currency",
        ] {
            assert!(properties.contains_key(key), "missing property {}", key);
        }

        let mut required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        required.sort();
        assert_eq!(required, vec!["depart_date", "destination", "origin"]);
    }

    #[test]
    fn test_envelope_serialization() {
        let failure = ToolResult::failure("boom");
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({"success": false, "error": "boom"})
        );

        let ok = ToolResult::ok("{}".to_string());
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"success": true, "content": "{}"})
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_network() {
        let config = AmadeusConfig::new("id", "secret").with_base_url("http://127.0.0.1:9");
        let tool = FlightSearchTool::new(config).unwrap();
        let result = tool
            .execute(
                serde_json::json!({"origin": "SFO", "depart_date": "2024-05-01"}),
                &CancellationToken::new(),
            )
            .await;
        assert!(!result.success);
        assert!(result.content.is_none());
        assert!(
            result
                .error
                .as_deref()
                .unwrap()
                .starts_with("invalid flight search arguments"),
            "{:?}",
            result.error
        );
        assert_eq!(tool.authenticator().exchange_count(), 0);
    }
}
