//! Error type shared by the tools and the server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Invalid parameters provided to the tool
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Tool name not in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Referenced taxonomy item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// JSON-RPC error code for this error type
    pub fn error_code(&self) -> i32 {
        match self {
            ToolError::InvalidParams(_) => -32602,
            ToolError::UnknownTool(_) => -32602,
            ToolError::NotFound(_) => -32001,
            ToolError::Internal(_) => -32603,
            ToolError::Serialization(_) => -32603,
        }
    }
}
