//! MCP Tool Implementations
//!
//! Each tool exposes one pipeline operation or one read-only taxonomy
//! projection. Tools are registered in the ToolRegistry and dispatched by
//! name.
//!
//! # Tool Categories
//!
//! - **Pipeline**: enhance_floral_prompt, generate_floral_workflow
//! - **Reference**: list_arrangement_styles, list_flowers_by_role,
//!   list_color_palettes, list_foliage_types, get_cultural_traditions,
//!   get_structural_techniques
//! - **Recommendation**: suggest_flowers_for_occasion
//! - **Meta**: get_server_info

mod registry;

pub mod enhance;
pub mod info;
pub mod occasion;
pub mod reference;
pub mod workflow;

pub use registry::ToolRegistry;

use crate::protocol::ToolDefinition;
use crate::types::ToolError;
use floral_intent::{Hints, IntentPipeline, PipelineOptions, MAX_TOP_K};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Read-only state handed to every tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub pipeline: Arc<IntentPipeline>,
    pub server_name: String,
    pub server_version: String,
    /// Registered tool names, sorted.
    pub tool_names: Vec<String>,
}

/// Trait for MCP tools
///
/// Execution is synchronous and side-effect free apart from the optional
/// synthesis call made by the pipeline tools.
pub trait McpTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError>;

    /// Get the tool definition for tools/list
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

macro_rules! require_param {
    ($args:expr, $name:literal, $ty:ty) => {
        match $args.get($name) {
            Some(value) => serde_json::from_value::<$ty>(value.clone()).map_err(|e| {
                $crate::types::ToolError::InvalidParams(format!("parameter '{}': {}", $name, e))
            })?,
            None => {
                return Err($crate::types::ToolError::InvalidParams(format!(
                    "missing required parameter: {}",
                    $name
                )))
            }
        }
    };
}

pub(crate) use require_param;

/// Deserialize tool arguments, treating absent arguments as an empty object.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// Per-request overrides, accepted in camelCase or snake_case.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestOptions {
    #[serde(default, alias = "top_k")]
    top_k: Option<usize>,
    #[serde(default, alias = "confidence_threshold")]
    confidence_threshold: Option<f64>,
    #[serde(default, alias = "allow_synthesis")]
    allow_synthesis: Option<bool>,
}

impl From<RequestOptions> for PipelineOptions {
    fn from(options: RequestOptions) -> Self {
        PipelineOptions {
            top_k: options.top_k,
            confidence_threshold: options.confidence_threshold,
            allow_synthesis: options.allow_synthesis,
        }
    }
}

/// Arguments shared by the two pipeline tools.
///
/// `style_preference`, `color_scheme` and `occasion` are shorthands: the
/// first two become style and palette hints unless one is already given,
/// the occasion is appended to the request text.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IntentArgs {
    #[serde(alias = "user_intent")]
    text: String,
    #[serde(default)]
    hints: Hints,
    #[serde(default)]
    options: RequestOptions,
    #[serde(default)]
    style_preference: Option<String>,
    #[serde(default)]
    color_scheme: Option<String>,
    #[serde(default)]
    occasion: Option<String>,
}

const NEUTRAL_STYLE: &str = "any";
const NEUTRAL_COLOR_SCHEME: &str = "harmonious";
const NEUTRAL_OCCASION: &str = "general";

impl IntentArgs {
    pub(crate) fn into_request(self) -> (String, Hints, PipelineOptions) {
        let mut hints = self.hints;
        let mut shorthand = |key: &str, value: Option<String>, neutral: &str| {
            if let Some(value) = value.map(|v| v.trim().to_string()) {
                if !value.is_empty() && !value.eq_ignore_ascii_case(neutral) {
                    let present = hints.keys().any(|k| k.eq_ignore_ascii_case(key));
                    if !present {
                        hints.insert(key.to_string(), value);
                    }
                }
            }
        };
        shorthand("style", self.style_preference, NEUTRAL_STYLE);
        shorthand("palette", self.color_scheme, NEUTRAL_COLOR_SCHEME);

        let text = match self.occasion.as_deref().map(str::trim) {
            Some(occasion) if !occasion.is_empty() && !occasion.eq_ignore_ascii_case(NEUTRAL_OCCASION) => {
                format!("{} {}", self.text, occasion)
            }
            _ => self.text,
        };
        (text, hints, self.options.into())
    }
}

/// JSON Schema fragment shared by the pipeline tools.
pub(crate) fn intent_properties() -> serde_json::Map<String, Value> {
    let schema = serde_json::json!({
        "text": {
            "type": "string",
            "description": "Free-text description of the desired arrangement, e.g. 'romantic spring wedding centerpiece'"
        },
        "hints": {
            "type": "object",
            "description": "Pin categories to taxonomy ids, e.g. {\"style\": \"nageire\", \"palette\": \"spring\"}",
            "additionalProperties": {"type": "string"}
        },
        "options": {
            "type": "object",
            "properties": {
                "topK": {"type": "integer", "minimum": 1, "maximum": MAX_TOP_K, "description": "Candidates kept per category"},
                "confidenceThreshold": {"type": "number", "minimum": 0, "maximum": 1, "description": "Skip synthesis at or above this confidence"},
                "allowSynthesis": {"type": "boolean", "description": "Permit the external synthesis call"}
            }
        },
        "style_preference": {"type": "string", "description": "Shorthand style hint, 'any' for none"},
        "color_scheme": {"type": "string", "description": "Shorthand palette hint, 'harmonious' for none"},
        "occasion": {"type": "string", "description": "Occasion appended to the request, 'general' for none"}
    });
    match schema {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}
