//! get_server_info - capabilities, taxonomy coverage and active thresholds.

use super::{McpTool, ToolContext};
use crate::types::ToolError;
use serde_json::{json, Value};

pub struct ServerInfoTool;

impl McpTool for ServerInfoTool {
    fn name(&self) -> &'static str {
        "get_server_info"
    }

    fn description(&self) -> &'static str {
        "Describe this server: architecture layers, available tools, taxonomy coverage \
         and the active matching and synthesis settings"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let config = ctx.pipeline.config();
        let summary = ctx.pipeline.store().summary();

        Ok(json!({
            "name": ctx.server_name,
            "version": ctx.server_version,
            "description": "Floral arrangement prompt enhancement and ComfyUI workflow generation",
            "architecture": {
                "layer_1": "Lexical matching of free text against the floral taxonomy (deterministic)",
                "layer_2": "Structural resolution into one compatible entry per category (deterministic)",
                "layer_3": "Optional external synthesis below the confidence threshold, with direct-format fallback"
            },
            "tools": ctx.tool_names,
            "taxonomy": serde_json::to_value(&summary)?,
            "settings": {
                "top_k": config.matcher.top_k,
                "default_score": config.matcher.default_score,
                "saturation": config.matcher.saturation,
                "confidence_threshold": config.gateway.confidence_threshold,
                "allow_synthesis": config.gateway.allow_synthesis,
                "synthesis_timeout_ms": u64::try_from(config.gateway.timeout.as_millis()).unwrap_or(u64::MAX),
                "synthesizer_configured": ctx.pipeline.has_synthesizer()
            }
        }))
    }
}
