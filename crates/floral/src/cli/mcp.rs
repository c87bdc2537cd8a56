//! MCP Server CLI launcher
//!
//! The server speaks JSON-RPC over stdio; logs go to stderr and the log file.

use super::build_pipeline;
use crate::config::FloralConfig;
use anyhow::{Context, Result};
use floral_mcp::McpServer;
use std::sync::Arc;

/// Run the MCP server until stdin closes.
pub fn run(config: &FloralConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let mut server = McpServer::new(config.server_config(), Arc::new(pipeline));

    tracing::info!(
        name = %config.server.name,
        synthesis = config.synthesis.command.is_some(),
        "MCP server starting via stdio"
    );

    server.run().context("MCP server failed")
}
