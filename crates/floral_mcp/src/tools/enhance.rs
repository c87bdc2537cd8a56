//! enhance_floral_prompt - map free text to a coherent floral selection and
//! a ready-to-use image prompt.

use super::{intent_properties, parse_args, IntentArgs, McpTool, ToolContext};
use crate::types::ToolError;
use serde_json::{json, Value};
use tracing::info;

pub struct EnhancePromptTool;

impl McpTool for EnhancePromptTool {
    fn name(&self) -> &'static str {
        "enhance_floral_prompt"
    }

    fn description(&self) -> &'static str {
        "Map an arrangement description to professional floral vocabulary: one style, \
         tradition, flower, foliage, palette and technique, an arrangement plan with flowers \
         per role and structure, plus an enhanced prompt"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": intent_properties(),
            "required": ["text"]
        })
    }

    fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: IntentArgs = parse_args(args)?;
        let (text, hints, options) = args.into_request();

        let result = ctx.pipeline.enhance(&text, &hints, &options);
        info!(
            confidence = result.selection.confidence.score,
            synthesis = %result.synthesis,
            "enhance_floral_prompt"
        );
        Ok(serde_json::to_value(&result)?)
    }
}
