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

//! # Flight Offers MCP Server
//!
//! Exposes `flight_search` over stdio or streamable HTTP.

use anyhow::{Context, Error, Result};
use clap::{Parser, Subcommand};
use delulu_flight_offers::{AmadeusConfig, FlightSearchArgs, FlightSearchTool, SearchRequest};
use rmcp::handler::server::{ServerHandler, tool::ToolRouter, wrapper::Parameters};
use rmcp::service::serve_server;
use rmcp::tool;
use rmcp::tool_router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "delulu-flight-offers-mcp")]
#[command(author, version, about = "MCP server for Amadeus flight offer search")]
struct Args {
    /// Override AMADEUS_BASE_URL (e.g. https://api.amadeus.com for production)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run MCP server over stdio (for Claude Desktop, etc.)
    Stdio,

    /// Run MCP server over HTTP
    Http {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[derive(Clone)]
pub struct FlightOffersServer {
    tool: Arc<FlightSearchTool>,
    shutdown: CancellationToken,
    tool_router: ToolRouter<Self>,
}

impl FlightOffersServer {
    pub fn new(tool: Arc<FlightSearchTool>, shutdown: CancellationToken) -> Self {
        Self {
            tool,
            shutdown,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl FlightOffersServer {
    #[tool(
        name = "flight_search",
        description = "Search for flights using origin, destination, dates, and preferences (Amadeus API). Parameters: origin (IATA), destination (IATA), depart_date (YYYY-MM-DD), return_date (YYYY-MM-DD, optional), passengers (1+), cabin (economy/premium_economy/business/first), max_price, currency (ISO 4217)."
    )]
    async fn flight_search(&self, params: Parameters<FlightSearchArgs>) -> Result<String, String> {
        let request = SearchRequest::try_from(params.0).map_err(|e| e.to_string())?;
        let cancel = self.shutdown.child_token();

        let result = self
            .tool
            .search(&request, &cancel)
            .await
            .map_err(|e| e.to_string())?;

        serde_json::to_string(&result).map_err(|e| e.to_string())
    }
}

impl ServerHandler for FlightOffersServer {
    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        tracing::debug!(
            "list_tools called, tools count: {}",
            self.tool_router.list_all().len()
        );
        Box::pin(async move {
            let tools = self.tool_router.list_all();
            Ok(rmcp::model::ListToolsResult::with_all_items(tools))
        })
    }

    fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        let router = self.tool_router.clone();
        let self_clone = self.clone();
        Box::pin(async move {
            let context =
                rmcp::handler::server::tool::ToolCallContext::new(&self_clone, request, context);
            router.call(context).await
        })
    }

    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2025_03_26,
            capabilities: rmcp::model::ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            server_info: rmcp::model::Implementation::from_build_env(),
            instructions: None,
        }
    }
}

/// Cancel `shutdown` on Ctrl-C so in-flight searches abort
fn spawn_ctrl_c_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling in-flight searches");
            shutdown.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".to_string().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();
    tracing::debug!("Parsed args: {:?}", args);

    let mut config = AmadeusConfig::from_env();
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    if !config.has_credentials() {
        tracing::warn!(
            "AMADEUS_CLIENT_ID / AMADEUS_CLIENT_SECRET not set; flight_search calls will fail"
        );
    }
    tracing::debug!("Using Amadeus endpoint {}", config.base_url);

    let tool =
        Arc::new(FlightSearchTool::new(config).context("Failed to create flight search tool")?);
    let shutdown = CancellationToken::new();
    spawn_ctrl_c_handler(shutdown.clone());

    match args.command {
        Command::Stdio => {
            eprintln!("Starting MCP server over stdio...");
            let server = FlightOffersServer::new(tool, shutdown.clone());
            let (stdin, stdout) = rmcp::transport::io::stdio();
            let running = serve_server(Arc::new(server), (stdin, stdout))
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
            tracing::debug!("Server running. Press Ctrl+C to stop.");
            tokio::select! {
                quit = running.waiting() => match quit {
                    Ok(_) => tracing::info!("MCP stdio session ended"),
                    Err(e) => tracing::warn!("MCP stdio session aborted: {}", e),
                },
                _ = shutdown.cancelled() => {}
            }
        }
        Command::Http { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .context("Invalid host:port")?;
            tracing::info!("Starting MCP server over HTTP on {}", addr);
            let server = FlightOffersServer::new(tool, shutdown.clone());
            let session_manager = Arc::new(LocalSessionManager::default());
            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..Default::default()
            };
            let service =
                StreamableHttpService::new(move || Ok(server.clone()), session_manager, config);
            let app = axum::Router::new().nest_service("/mcp", service);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            tracing::debug!("Listening on {}", addr);
            let graceful = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { graceful.cancelled().await })
                .await
                .context("HTTP server error")?;
        }
    }

    Ok(())
}
