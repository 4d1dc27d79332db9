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

//! # Flight Offers Query Builder
//!
//! Side-effect free mapping from tool arguments to a typed [`SearchRequest`],
//! a human-readable query summary and Amadeus query parameters.

use crate::error::FlightSearchError;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw tool arguments as sent by the calling workflow.
///
/// Fields are coerced leniently: text fields accept numbers, numeric fields
/// accept numeric strings, and blank strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct FlightSearchArgs {
    /// Origin IATA airport code
    #[serde(deserialize_with = "lenient::required_text")]
    #[schemars(with = "String")]
    pub origin: String,

    /// Destination IATA airport code
    #[serde(deserialize_with = "lenient::required_text")]
    #[schemars(with = "String")]
    pub destination: String,

    /// Departure date (YYYY-MM-DD)
    #[serde(deserialize_with = "lenient::required_text")]
    #[schemars(with = "String")]
    pub depart_date: String,

    /// Return date (YYYY-MM-DD) or empty for one-way
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub return_date: Option<String>,

    /// Number of passengers
    #[serde(default, deserialize_with = "lenient::optional_number")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub passengers: Option<f64>,

    /// Cabin class
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub cabin: Option<String>,

    /// Maximum price
    #[serde(default, deserialize_with = "lenient::optional_number")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub max_price: Option<f64>,

    /// Currency code
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub currency: Option<String>,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_text(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    fn to_number(value: Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    }

    pub fn required_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(to_text(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(to_text(Value::deserialize(d)?))
    }

    pub fn optional_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(to_number(Value::deserialize(d)?))
    }
}

/// Amadeus travel classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cabin {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl Cabin {
    /// Value of the `travelClass` query parameter
    pub fn provider_code(self) -> &'static str {
        match self {
            Cabin::Economy => "ECONOMY",
            Cabin::PremiumEconomy => "PREMIUM_ECONOMY",
            Cabin::Business => "BUSINESS",
            Cabin::First => "FIRST",
        }
    }

    /// Lower-cased name used in query summaries
    pub fn label(self) -> &'static str {
        match self {
            Cabin::Economy => "economy",
            Cabin::PremiumEconomy => "premium_economy",
            Cabin::Business => "business",
            Cabin::First => "first",
        }
    }
}

impl fmt::Display for Cabin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Cabin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "economy" | "e" => Ok(Cabin::Economy),
            "premium_economy" | "premium" | "pe" => Ok(Cabin::PremiumEconomy),
            "business" | "b" => Ok(Cabin::Business),
            "first" | "f" => Ok(Cabin::First),
            _ => Err(format!(
                "Invalid cabin class: {}. Use: economy, premium_economy, business, first",
                s
            )),
        }
    }
}

/// Accepts `YYYY-MM-DD`, and `YYYY/MM/DD` for convenience
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}

/// Typed flight offer search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    /// Only set when explicitly requested; the provider gets 1 adult otherwise
    pub passengers: Option<u32>,
    pub cabin: Option<Cabin>,
    pub max_price: Option<f64>,
    pub currency: Option<String>,
}

impl SearchRequest {
    fn validate(&self) -> Result<(), FlightSearchError> {
        if self.origin.is_empty() {
            return Err(FlightSearchError::InvalidArguments(
                "origin is required".to_string(),
            ));
        }
        if self.destination.is_empty() {
            return Err(FlightSearchError::InvalidArguments(
                "destination is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn builder(
        origin: impl Into<String>,
        destination: impl Into<String>,
        depart_date: NaiveDate,
    ) -> SearchRequestBuilder {
        SearchRequestBuilder {
            origin: origin.into(),
            destination: destination.into(),
            depart_date,
            return_date: None,
            passengers: None,
            cabin: None,
            max_price: None,
            currency: None,
        }
    }

    /// Adult count sent to the provider
    pub fn adults(&self) -> u32 {
        self.passengers.filter(|&n| n > 0).unwrap_or(1)
    }

    fn effective_max_price(&self) -> Option<f64> {
        self.max_price.filter(|&p| p > 0.0)
    }

    /// Human-readable summary, e.g. `SFO → JFK, depart 2024-05-01, 2 pax`
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} → {}", self.origin, self.destination)];
        parts.push(format!("depart {}", self.depart_date.format("%Y-%m-%d")));
        if let Some(return_date) = self.return_date {
            parts.push(format!("return {}", return_date.format("%Y-%m-%d")));
        }
        if let Some(n) = self.passengers.filter(|&n| n > 0) {
            parts.push(format!("{} pax", n));
        }
        if let Some(cabin) = self.cabin {
            parts.push(cabin.label().to_string());
        }
        if let Some(max_price) = self.effective_max_price() {
            match &self.currency {
                Some(currency) => parts.push(format!("max {:.0} {}", max_price, currency)),
                // No trailing space when the currency is absent: `max 500`, not `max 500 `
                None => parts.push(format!("max {:.0}", max_price)),
            }
        }
        parts.join(", ")
    }

    /// Query parameters for `GET /v2/shopping/flight-offers`, in a stable order
    pub fn provider_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("originLocationCode", self.origin.clone()),
            ("destinationLocationCode", self.destination.clone()),
            (
                "departureDate",
                self.depart_date.format("%Y-%m-%d").to_string(),
            ),
        ];
        if let Some(return_date) = self.return_date {
            params.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
        }
        params.push(("adults", self.adults().to_string()));
        if let Some(cabin) = self.cabin {
            params.push(("travelClass", cabin.provider_code().to_string()));
        }
        if let Some(currency) = &self.currency {
            params.push(("currencyCode", currency.clone()));
        }
        if let Some(max_price) = self.effective_max_price() {
            params.push(("maxPrice", format!("{:.0}", max_price)));
        }
        params.push(("nonStop", "false".to_string()));
        params
    }
}

/// Summary text and provider parameters for a request
pub fn build_query(request: &SearchRequest) -> (String, Vec<(&'static str, String)>) {
    (request.summary(), request.provider_params())
}

/// URL query string for provider parameters
pub fn encode_query(params: &[(&'static str, String)]) -> String {
    encode_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
}

/// `application/x-www-form-urlencoded` encoding of key/value pairs
pub(crate) fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

impl TryFrom<FlightSearchArgs> for SearchRequest {
    type Error = FlightSearchError;

    fn try_from(args: FlightSearchArgs) -> Result<Self, Self::Error> {
        if args.depart_date.is_empty() {
            return Err(FlightSearchError::InvalidArguments(
                "depart_date is required".to_string(),
            ));
        }
        let depart_date = parse_date(&args.depart_date).ok_or_else(|| {
            FlightSearchError::InvalidArguments(format!(
                "depart_date must be YYYY-MM-DD, got {}",
                args.depart_date
            ))
        })?;

        let mut builder =
            SearchRequest::builder(args.origin, args.destination, depart_date);

        if let Some(raw) = args.return_date {
            match parse_date(&raw) {
                Some(date) => builder = builder.return_date(date),
                None => tracing::warn!("Ignoring unparseable return_date: {}", raw),
            }
        }

        if let Some(n) = args.passengers {
            if n >= 1.0 {
                builder = builder.passengers(n as u32);
            } else {
                tracing::debug!("Non-positive passengers ({}), defaulting to 1 adult", n);
            }
        }

        if let Some(raw) = args.cabin {
            match raw.parse::<Cabin>() {
                Ok(cabin) => builder = builder.cabin(cabin),
                Err(e) => tracing::warn!("Ignoring cabin: {}", e),
            }
        }

        if let Some(max_price) = args.max_price {
            if max_price >= 0.0 {
                builder = builder.max_price(max_price);
            } else {
                tracing::warn!("Ignoring negative max_price: {}", max_price);
            }
        }

        if let Some(currency) = args.currency {
            builder = builder.currency(currency);
        }

        builder.build()
    }
}

#[derive(Clone)]
pub struct SearchRequestBuilder {
    origin: String,
    destination: String,
    depart_date: NaiveDate,
    return_date: Option<NaiveDate>,
    passengers: Option<u32>,
    cabin: Option<Cabin>,
    max_price: Option<f64>,
    currency: Option<String>,
}

impl SearchRequestBuilder {
    pub fn return_date(mut self, return_date: NaiveDate) -> Self {
        self.return_date = Some(return_date);
        self
    }

    pub fn passengers(mut self, passengers: u32) -> Self {
        self.passengers = Some(passengers);
        self
    }

    pub fn cabin(mut self, cabin: Cabin) -> Self {
        self.cabin = Some(cabin);
        self
    }

    pub fn max_price(mut self, max_price: f64) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        let currency = currency.into().trim().to_uppercase();
        self.currency = (!currency.is_empty()).then_some(currency);
        self
    }

    pub fn build(self) -> Result<SearchRequest, FlightSearchError> {
        // Codes are normalized to upper case here, so `lax` reads `LAX` in the
        // summary as well as in the provider parameters
        let request = SearchRequest {
            origin: self.origin.trim().to_uppercase(),
            destination: self.destination.trim().to_uppercase(),
            depart_date: self.depart_date,
            return_date: self.return_date,
            passengers: self.passengers,
            cabin: self.cabin,
            max_price: self.max_price,
            currency: self.currency,
        };
        request.validate()?;
        Ok(request)
    }
}
