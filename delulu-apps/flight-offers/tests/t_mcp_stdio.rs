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

//! MCP server integration tests using subprocess with stdio transport.
//!
//! None of these reach Amadeus: credentials are stripped from the child
//! environment so `flight_search` fails fast with a configuration error.

#![cfg(feature = "mcp")]

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Once;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_thread_ids(true)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::DEBUG)
            .init();
    });
}

fn find_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_delulu-flight-offers-mcp"))
}

struct McpSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl McpSession {
    async fn spawn() -> Result<Self> {
        let mut child = Command::new(find_binary())
            .arg("stdio")
            .env_remove("AMADEUS_CLIENT_ID")
            .env_remove("AMADEUS_CLIENT_SECRET")
            .env("AMADEUS_BASE_URL", "http://127.0.0.1:9")
            .env("RUST_LOG", "warn")
            .stdout(Stdio::piped())
            .stdin(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn MCP server")?;

        let stdin = child.stdin.take().context("no stdin")?;
        let stdout = BufReader::new(child.stdout.take().context("no stdout")?).lines();
        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    async fn send(&mut self, message: Value) -> Result<()> {
        let mut line = message.to_string();
        line.push('\n');
        tracing::debug!("Sending: {}", line.trim_end());
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the JSON-RPC response with `id` shows up
    async fn response(&mut self, id: u64) -> Result<Value> {
        loop {
            let line = tokio::time::timeout(TIMEOUT, self.stdout.next_line())
                .await
                .context("Timed out waiting for MCP response")??
                .context("Server closed stdout")?;
            tracing::debug!("Received: {}", line);
            let Ok(message) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            if message.get("id").and_then(Value::as_u64) == Some(id) {
                return Ok(message);
            }
        }
    }

    async fn initialize(&mut self) -> Result<Value> {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }
        }))
        .await?;
        let response = self.response(1).await?;
        self.send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await?;
        Ok(response)
    }
}

#[tokio::test]
async fn test_mcp_help_output() -> Result<()> {
    init_tracing();
    let output = Command::new(find_binary()).arg("--help").output().await?;

    assert!(output.status.success(), "Help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("delulu-flight-offers-mcp"),
        "Help should show binary name"
    );
    assert!(stdout.contains("stdio"), "Help should show stdio command");
    assert!(stdout.contains("http"), "Help should show http command");
    assert!(stdout.contains("--base-url"), "Help should show --base-url");

    Ok(())
}

#[tokio::test]
async fn test_mcp_version_output() -> Result<()> {
    init_tracing();
    let output = Command::new(find_binary()).arg("--version").output().await?;

    assert!(output.status.success(), "Version should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.1.0"), "Version should show 0.1.0");

    Ok(())
}

#[tokio::test]
async fn test_mcp_initialize_advertises_tools() -> Result<()> {
    init_tracing();
    let mut session = McpSession::spawn().await?;

    let response = session.initialize().await?;
    assert_eq!(response["jsonrpc"], "2.0");
    assert!(
        response["result"]["capabilities"]["tools"].is_object(),
        "tools capability missing: {}",
        response
    );

    Ok(())
}

#[tokio::test]
async fn test_mcp_lists_flight_search() -> Result<()> {
    init_tracing();
    let mut session = McpSession::spawn().await?;
    session.initialize().await?;

    session
        .send(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list", "params": {}}))
        .await?;
    let response = session.response(2).await?;

    let tools = response["result"]["tools"]
        .as_array()
        .context("tools/list result has no tools array")?;
    assert_eq!(tools.len(), 1, "{}", response);

    let tool = &tools[0];
    assert_eq!(tool["name"], "flight_search");
    assert!(
        tool["description"]
            .as_str()
            .unwrap_or_default()
            .contains("Amadeus")
    );

    let schema = &tool["inputSchema"];
    for key in ["origin", "destination", "depart_date", "cabin", "max_price"] {
        assert!(
            schema["properties"].get(key).is_some(),
            "inputSchema missing {}: {}",
            key,
            schema
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_mcp_flight_search_without_credentials() -> Result<()> {
    init_tracing();
    let mut session = McpSession::spawn().await?;
    session.initialize().await?;

    session
        .send(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "flight_search",
                "arguments": {
                    "origin": "SFO",
                    "destination": "JFK",
                    "depart_date": "2030-05-01"
                }
            }
        }))
        .await?;
    let response = session.response(3).await?;

    let result = &response["result"];
    assert_eq!(result["isError"], true, "{}", response);
    let text = result["content"][0]["text"].as_str().unwrap_or_default();
    assert!(
        text.contains("missing AMADEUS_CLIENT_ID or AMADEUS_CLIENT_SECRET"),
        "unexpected error text: {}",
        text
    );

    drop(session.stdin);
    let status = tokio::time::timeout(TIMEOUT, session.child.wait()).await??;
    assert!(status.success(), "server should exit cleanly once stdin closes");

    Ok(())
}
