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

//! CLI for Amadeus flight offer search.

use anyhow::{Context, Result};
use clap::Parser;
use delulu_flight_offers::{
    AmadeusConfig, Cabin, FlightOffer, FlightSearchTool, SearchRequest, SearchResult, parse_date,
};
use std::cmp::max;
use tokio_util::sync::CancellationToken;

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "delulu-flight-offers")]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Origin airport code (e.g., SFO, CDG)
    #[arg(short, long)]
    origin: String,

    /// Destination airport code (e.g., JFK, LHR)
    #[arg(short, long)]
    destination: String,

    /// Departure date (YYYY-MM-DD or YYYY/MM/DD)
    #[arg(long)]
    date: String,

    /// Return date for round trips (YYYY-MM-DD or YYYY/MM/DD)
    #[arg(short = 'R', long)]
    return_date: Option<String>,

    /// Number of passengers (adults)
    #[arg(short, long)]
    passengers: Option<u32>,

    /// Cabin class: economy, premium_economy, business, first
    #[arg(short, long)]
    cabin: Option<String>,

    /// Maximum total price, in whole currency units
    #[arg(long)]
    max_price: Option<f64>,

    /// ISO 4217 currency code (e.g., USD, EUR)
    #[arg(long)]
    currency: Option<String>,

    /// Override AMADEUS_BASE_URL (e.g. https://api.amadeus.com for production)
    #[arg(long)]
    base_url: Option<String>,

    /// Print the raw search result as JSON instead of a table
    #[arg(long, default_value = "false")]
    json: bool,

    /// Verbose output
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

/// Configure logging based on verbosity level. Logs go to stderr so `--json` stays pipeable.
fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date_arg(s: &str) -> Result<chrono::NaiveDate> {
    parse_date(s).with_context(|| format!("Invalid date format: {}. Use YYYY-MM-DD or YYYY/MM/DD", s))
}

fn build_request(args: &CliArgs) -> Result<SearchRequest> {
    let depart_date = parse_date_arg(&args.date)?;
    let mut builder = SearchRequest::builder(&args.origin, &args.destination, depart_date);

    if let Some(rd) = &args.return_date {
        builder = builder.return_date(parse_date_arg(rd)?);
    }
    if let Some(n) = args.passengers {
        builder = builder.passengers(n);
    }
    if let Some(cabin) = &args.cabin {
        let cabin: Cabin = cabin.parse().map_err(anyhow::Error::msg)?;
        builder = builder.cabin(cabin);
    }
    if let Some(max_price) = args.max_price {
        builder = builder.max_price(max_price);
    }
    if let Some(currency) = &args.currency {
        builder = builder.currency(currency);
    }

    builder
        .build()
        .context("Failed to build search parameters")
}

/// `PT6H30M` -> `6h 30m`. Anything unrecognized is shown as-is.
fn fmt_duration(iso: &str) -> String {
    let Some(rest) = iso.strip_prefix("PT") else {
        return iso.to_string();
    };
    let (hrs, rest) = match rest.split_once('H') {
        Some((h, r)) => (h.parse::<u32>().ok(), r),
        None => (Some(0), rest),
    };
    let mins = match rest.strip_suffix('M') {
        Some(m) => m.parse::<u32>().ok(),
        None if rest.is_empty() => Some(0),
        None => None,
    };
    match (hrs, mins) {
        (Some(h), Some(0)) => format!("{}h", h),
        (Some(0), Some(m)) => format!("{}m", m),
        (Some(h), Some(m)) => format!("{}h {:02}m", h, m),
        _ => iso.to_string(),
    }
}

fn fmt_stops(stops: usize) -> String {
    match stops {
        0 => "direct".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    }
}

fn fmt_times(offer: &FlightOffer) -> String {
    let dep = if offer.depart_time.is_empty() { "??:??" } else { &offer.depart_time };
    let arr = if offer.arrive_time.is_empty() { "??:??" } else { &offer.arrive_time };
    format!("{} → {}", dep, arr)
}

/// Get terminal width for responsive tables
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(100)
}

fn dash_bar() -> String {
    "-".repeat(get_terminal_width().min(100))
}

fn render_results(result: &SearchResult) {
    let title_bar = format!(
        "================================================================================================\n  🛫  {}\n================================================================================================",
        result.query
    );
    println!("{}\n", title_bar);
    println!("📊 Total Offers: {}", result.results.len());

    if result.results.is_empty() {
        println!("\nNo offers found.");
        return;
    }

    let mut flight_w = 8;
    let mut route_w = 9;
    let mut times_w = 15;
    for offer in &result.results {
        flight_w = max(flight_w, offer.flight_number.len());
        route_w = max(route_w, offer.origin.len() + offer.destination.len() + 3);
        times_w = max(times_w, fmt_times(offer).chars().count());
    }

    println!("\n{}\n", dash_bar());
    println!(
        "  {:>3}  {:<fw$}  {:<rw$}  {:<tw$}  {:<10}  {:<9}  PRICE",
        "#",
        "FLIGHT",
        "ROUTE",
        "DEP → ARR",
        "DURATION",
        "STOPS",
        fw = flight_w,
        rw = route_w,
        tw = times_w
    );
    println!("{}\n", dash_bar());

    for (i, offer) in result.results.iter().enumerate() {
        let route = format!("{}-{}", offer.origin, offer.destination);
        println!(
            "  {:>3}  {:<fw$}  {:<rw$}  {:<tw$}  {:<10}  {:<9}  {} {}",
            i + 1,
            offer.flight_number,
            route,
            fmt_times(offer),
            fmt_duration(&offer.duration),
            fmt_stops(offer.stops),
            offer.price,
            offer.currency,
            fw = flight_w,
            rw = route_w,
            tw = times_w
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    tracing::info!("Starting delulu-flight-offers CLI");
    tracing::debug!("Args: {:?}", args);

    let request = build_request(&args)?;
    tracing::info!("Parsed request: {}", request.summary());

    let mut config = AmadeusConfig::from_env();
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url.as_str());
    }
    let tool = FlightSearchTool::new(config).context("Failed to create flight search tool")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = tool
        .search(&request, &cancel)
        .await
        .context("Search failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        render_results(&result);
    }

    Ok(())
}
