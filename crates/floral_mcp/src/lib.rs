//! MCP server for floral arrangement prompt enhancement.
//!
//! Exposes the intent pipeline and the taxonomy reference projections as
//! MCP tools over JSON-RPC 2.0 on stdio.

pub mod comfyui;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod types;

pub use server::{McpServer, McpServerConfig};
pub use tools::{McpTool, ToolContext, ToolRegistry};
pub use types::ToolError;
