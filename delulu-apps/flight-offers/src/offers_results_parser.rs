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

//! # Flight Offers Results Parser
//!
//! Side-effect free parsing of the Amadeus flight-offers JSON.
//! Flattens each offer's first itinerary into a [`FlightOffer`].

use crate::error::FlightSearchError;
use serde::{Deserialize, Deserializer, Serialize};

/// Canonical flight offer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub airline: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub depart_time: String,
    pub arrive_time: String,
    /// ISO-8601 duration as reported, e.g. `PT6H30M`
    pub duration: String,
    pub stops: usize,
    /// Decimal string as reported, never converted to a float
    pub price: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedOffers {
    pub offers: Vec<FlightOffer>,
    /// Offers dropped because they had no usable itinerary or segment
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOffer {
    #[serde(deserialize_with = "null_as_default")]
    price: RawPrice,
    #[serde(deserialize_with = "null_as_default")]
    itineraries: Vec<RawItinerary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPrice {
    #[serde(deserialize_with = "null_as_default")]
    total: String,
    #[serde(deserialize_with = "null_as_default")]
    currency: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawItinerary {
    #[serde(deserialize_with = "null_as_default")]
    duration: String,
    #[serde(deserialize_with = "null_as_default")]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSegment {
    #[serde(deserialize_with = "null_as_default")]
    carrier_code: String,
    #[serde(deserialize_with = "null_as_default")]
    number: String,
    #[serde(deserialize_with = "null_as_default")]
    departure: RawEndpoint,
    #[serde(deserialize_with = "null_as_default")]
    arrival: RawEndpoint,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawEndpoint {
    #[serde(deserialize_with = "null_as_default")]
    iata_code: String,
    #[serde(deserialize_with = "null_as_default")]
    at: String,
}

/// `null` reads as the field's default, same as a missing key
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Parse an Amadeus `/v2/shopping/flight-offers` response body.
///
/// Only a body that is not valid JSON, or whose `data` is neither an array
/// nor `null`, is an error. Offers without itineraries, with an empty first itinerary, or with
/// an unexpected shape are skipped and counted.
pub fn parse_offers_response(body: &[u8]) -> Result<ParsedOffers, FlightSearchError> {
    let raw: RawResponse = serde_json::from_slice(body).map_err(FlightSearchError::Parse)?;

    let mut parsed = ParsedOffers {
        offers: Vec::with_capacity(raw.data.len()),
        skipped: 0,
    };

    for (idx, value) in raw.data.into_iter().enumerate() {
        let offer = match serde_json::from_value::<RawOffer>(value) {
            Ok(offer) => offer,
            Err(e) => {
                tracing::debug!("Offer #{} has an unexpected shape: {}", idx, e);
                parsed.skipped += 1;
                continue;
            }
        };
        match flatten_offer(offer) {
            Some(flat) => parsed.offers.push(flat),
            None => {
                tracing::debug!("Offer #{} has no itinerary segments", idx);
                parsed.skipped += 1;
            }
        }
    }

    if parsed.skipped > 0 {
        tracing::warn!(
            "Skipped {} malformed offer(s), kept {}",
            parsed.skipped,
            parsed.offers.len()
        );
    }

    Ok(parsed)
}

/// Return itineraries (index 1+) are not represented in the flat record.
fn flatten_offer(offer: RawOffer) -> Option<FlightOffer> {
    let RawOffer { price, itineraries } = offer;
    let itinerary = itineraries.into_iter().next()?;
    let first = itinerary.segments.first()?;
    let last = itinerary.segments.last()?;

    Some(FlightOffer {
        airline: first.carrier_code.clone(),
        flight_number: format!("{}{}", first.carrier_code, first.number)
            .trim()
            .to_string(),
        origin: first.departure.iata_code.clone(),
        destination: last.arrival.iata_code.clone(),
        depart_time: time_of_day(&first.departure.at).to_string(),
        arrive_time: time_of_day(&last.arrival.at).to_string(),
        duration: itinerary.duration.clone(),
        stops: itinerary.segments.len() - 1,
        price: price.total,
        currency: price.currency,
    })
}

/// `2024-05-01T08:00:00` -> `08:00:00`; values without a `T` are returned whole
fn time_of_day(timestamp: &str) -> &str {
    match timestamp.split_once('T') {
        Some((_, time)) => time,
        None => timestamp,
    }
}
