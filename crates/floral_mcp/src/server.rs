//! MCP Server Implementation
//!
//! JSON-RPC 2.0 server over stdio for the Model Context Protocol.
//!
//! # Architecture
//!
//! The server runs in a single process, reading one JSON-RPC message per
//! line and writing one response per request. Notifications get no
//! response. The taxonomy and pipeline are built once and shared read-only
//! by every tool call.
//!
//! # Example
//!
//! ```ignore
//! let pipeline = Arc::new(IntentPipeline::new(store, PipelineConfig::default()));
//! let mut server = McpServer::new(McpServerConfig::default(), pipeline);
//! server.run()?; // Blocking, no async runtime required
//! ```

use crate::protocol::{
    methods, ContentBlock, ErrorCode, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo, ToolCallParams,
    ToolCallResult, ToolsCapability, ToolsListResult, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
    SERVER_NOT_INITIALIZED,
};
use crate::tools::{ToolContext, ToolRegistry};
use crate::types::ToolError;
use anyhow::{Context, Result};
use floral_intent::IntentPipeline;
use serde::Serialize;
use serde_json::Value;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SERVER_NAME: &str = "floral-mcp";
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name (reported in initialize)
    pub server_name: String,

    /// Server version (reported in initialize)
    pub server_version: String,

    /// Tool results larger than this are replaced by a truncation notice
    pub max_response_bytes: usize,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

pub struct McpServer {
    config: McpServerConfig,
    tools: ToolRegistry,
    context: ToolContext,
    initialized: bool,
}

impl McpServer {
    pub fn new(config: McpServerConfig, pipeline: Arc<IntentPipeline>) -> Self {
        let tools = ToolRegistry::new();
        let context = ToolContext {
            pipeline,
            server_name: config.server_name.clone(),
            server_version: config.server_version.clone(),
            tool_names: tools.names(),
        };
        Self {
            config,
            tools,
            context,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdin/stdout (blocking).
    pub fn run(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    /// Serve newline-delimited JSON-RPC until the reader hits EOF.
    pub fn serve<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> Result<()> {
        info!(
            name = %self.config.server_name,
            version = %self.config.server_version,
            tools = self.tools.len(),
            "MCP server starting"
        );

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .context("Failed to read from stdin")?;
            if read == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line),
                Err(e) => {
                    warn!("Message is not valid UTF-8: {}", e);
                    Some(JsonRpcResponse::error(
                        None,
                        JsonRpcError::new(ErrorCode::ParseError, format!("Invalid UTF-8: {}", e)),
                    ))
                }
            };
            if let Some(response) = response {
                write_response(&mut writer, &response)?;
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle one raw line. `None` for blank lines and notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        debug!("Received: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                warn!("Unparseable message: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::new(ErrorCode::ParseError, format!("Invalid JSON: {}", e)),
                ));
            }
        };

        self.handle_request(request)
    }

    pub fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(
                    ErrorCode::InvalidRequest,
                    format!("Invalid JSON-RPC version: {}", request.jsonrpc),
                ),
            ));
        }

        if request.is_notification() {
            debug!(method = %request.method, "Notification");
            if request.method == methods::INITIALIZED && !self.initialized {
                warn!("Initialized notification before initialize");
            }
            return None;
        }

        let response = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request),
            methods::PING => JsonRpcResponse::success(request.id, Value::Object(Default::default())),
            methods::INITIALIZED => JsonRpcResponse::success(request.id, Value::Object(Default::default())),
            methods::TOOLS_LIST => self.handle_tools_list(request),
            methods::TOOLS_CALL => self.handle_tools_call(request),
            _ => JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(
                    ErrorCode::MethodNotFound,
                    format!("Unknown method: {}", request.method),
                ),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: InitializeParams = match request.params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::new(
                            ErrorCode::InvalidParams,
                            format!("Invalid initialize params: {}", e),
                        ),
                    );
                }
            },
            None => InitializeParams::default(),
        };

        match &params.client_info {
            Some(client) => info!(
                "Initialize from {} v{} (protocol {})",
                client.name, client.version, params.protocol_version
            ),
            None => info!("Initialize (protocol {})", params.protocol_version),
        }

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: self.config.server_name.clone(),
                version: self.config.server_version.clone(),
            },
        };
        success(request.id, &result)
    }

    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.tools.list_tools(),
        };
        success(request.id, &result)
    }

    fn handle_tools_call(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if !self.initialized {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(SERVER_NOT_INITIALIZED, "Server not initialized"),
            );
        }

        let params: ToolCallParams = match request.params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::new(
                        ErrorCode::InvalidParams,
                        format!("Invalid tool call params: {}", e),
                    ),
                );
            }
            None => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::new(ErrorCode::InvalidParams, "Missing tool call params"),
                );
            }
        };

        info!("Tool call: {}", params.name);

        match self.tools.call_tool(&params.name, params.arguments, &self.context) {
            Ok(value) => {
                let result = self.tool_result(&value);
                success(request.id, &result)
            }
            Err(e @ ToolError::UnknownTool(_)) => {
                warn!("{}", e);
                JsonRpcResponse::error(request.id, JsonRpcError::from_tool_error(&e))
            }
            Err(e) => {
                error!("Tool error: {}", e);
                let result = ToolCallResult {
                    content: vec![ContentBlock::text(format!("Error: {}", e))],
                    is_error: true,
                };
                success(request.id, &result)
            }
        }
    }

    /// Single text block of JSON, or a truncation notice flagged as an error.
    fn tool_result(&self, value: &Value) -> ToolCallResult {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize tool result: {}", e);
                return ToolCallResult {
                    content: vec![ContentBlock::text(format!("Error: serialization failed: {}", e))],
                    is_error: true,
                };
            }
        };

        if json.len() <= self.config.max_response_bytes {
            return ToolCallResult {
                content: vec![ContentBlock::text(json)],
                is_error: false,
            };
        }

        warn!(
            "Response truncated from {} to {} bytes",
            json.len(),
            self.config.max_response_bytes
        );
        let notice = serde_json::json!({
            "truncated": true,
            "max_bytes": self.config.max_response_bytes,
            "original_bytes": json.len(),
            "message": "Response exceeded size limit. Narrow the request or lower topK.",
        });
        ToolCallResult {
            content: vec![ContentBlock::text(notice.to_string())],
            is_error: true,
        }
    }
}

fn success<T: Serialize>(id: Option<crate::protocol::RequestId>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            JsonRpcResponse::error(
                id,
                JsonRpcError::new(ErrorCode::InternalError, "Failed to serialize response"),
            )
        }
    }
}

fn write_response<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(response)?;
    debug!("Sending: {}", json);
    writeln!(writer, "{}", json).context("Failed to write response")?;
    writer.flush().context("Failed to flush response")?;
    Ok(())
}
