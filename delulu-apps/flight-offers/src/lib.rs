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

// Library for delulu-flight-offers
// Amadeus flight offer search, exposed as a workflow tool

mod amadeus_auth;
mod config;
mod error;
mod flight_search_tool;
mod offers_query_builder;
mod offers_results_parser;
mod offers_search;

pub use amadeus_auth::AmadeusAuthenticator;
pub use config::{
    AmadeusConfig, DEFAULT_BASE_URL, ENV_BASE_URL, ENV_CLIENT_ID, ENV_CLIENT_SECRET,
    SEARCH_TIMEOUT, TOKEN_TIMEOUT,
};
pub use error::FlightSearchError;
pub use flight_search_tool::{
    FlightSearchTool, SOURCE, SearchResult, TOOL_DESCRIPTION, TOOL_NAME, ToolResult,
};
pub use offers_query_builder::{
    Cabin, FlightSearchArgs, SearchRequest, SearchRequestBuilder, build_query, encode_query,
    parse_date,
};
pub use offers_results_parser::{FlightOffer, ParsedOffers, parse_offers_response};
pub use offers_search::AmadeusOffersClient;

// Re-export the clocks so callers can drive token expiry in tests
pub use delulu_token_cache::{Clock, ManualClock, SystemClock};
