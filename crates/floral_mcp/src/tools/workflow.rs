//! generate_floral_workflow - workflow slots plus a ready-to-import
//! ComfyUI graph for the resolved arrangement.

use super::{intent_properties, parse_args, IntentArgs, McpTool, ToolContext};
use crate::comfyui::{
    build_graph, seed_from_fingerprint, validate_steps, GraphSpec, ModelPreference, OutputSize,
    DEFAULT_OUTPUT_SIZE, DEFAULT_STEPS, MAX_STEPS, MIN_STEPS, USAGE_INSTRUCTIONS,
};
use crate::types::ToolError;
use floral_intent::adapter::DEFAULT_NEGATIVE_PROMPT;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub struct GenerateWorkflowTool;

#[derive(Debug, Deserialize)]
struct GraphArgs {
    #[serde(default)]
    output_size: Option<String>,
    #[serde(default, alias = "model_preference")]
    model: Option<String>,
    #[serde(default)]
    steps: Option<u32>,
}

impl McpTool for GenerateWorkflowTool {
    fn name(&self) -> &'static str {
        "generate_floral_workflow"
    }

    fn description(&self) -> &'static str {
        "Resolve an arrangement description into fixed workflow slots and a complete \
         ComfyUI API workflow (checkpoint, prompts, latent, sampler, decode, save)"
    }

    fn input_schema(&self) -> Value {
        let mut properties = intent_properties();
        properties.insert(
            "output_size".to_string(),
            json!({
                "type": "string",
                "default": DEFAULT_OUTPUT_SIZE,
                "description": "Image dimensions as WIDTHxHEIGHT, e.g. 1024x1024, 768x1024, 1536x1024"
            }),
        );
        properties.insert(
            "model".to_string(),
            json!({
                "type": "string",
                "enum": ["flux", "sdxl", "sd15"],
                "default": "flux",
                "description": "Base model checkpoint"
            }),
        );
        properties.insert(
            "steps".to_string(),
            json!({
                "type": "integer",
                "minimum": MIN_STEPS,
                "maximum": MAX_STEPS,
                "default": DEFAULT_STEPS,
                "description": "Sampling steps"
            }),
        );
        json!({
            "type": "object",
            "properties": properties,
            "required": ["text"]
        })
    }

    fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let graph_args: GraphArgs = parse_args(args.clone())?;
        let size: OutputSize = graph_args
            .output_size
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_SIZE)
            .parse()?;
        let model: ModelPreference = match graph_args.model.as_deref() {
            Some(model) => model.parse()?,
            None => ModelPreference::default(),
        };
        let steps = validate_steps(graph_args.steps.unwrap_or(DEFAULT_STEPS))?;

        let intent: IntentArgs = parse_args(args)?;
        let (text, hints, options) = intent.into_request();
        let result = ctx.pipeline.workflow(&text, &hints, &options);

        let positive_prompt = result
            .workflow_slots
            .get("positive_prompt")
            .cloned()
            .unwrap_or_default();
        let negative_prompt = result
            .workflow_slots
            .get("negative_prompt")
            .cloned()
            .unwrap_or_else(|| DEFAULT_NEGATIVE_PROMPT.to_string());
        let seed = seed_from_fingerprint(&result.selection.fingerprint);

        let graph = build_graph(&GraphSpec {
            positive_prompt: &positive_prompt,
            negative_prompt: &negative_prompt,
            size,
            model,
            steps,
            seed,
        });

        info!(
            confidence = result.selection.confidence.score,
            synthesis = %result.synthesis,
            model = %model,
            size = %size,
            "generate_floral_workflow"
        );

        let mut value = serde_json::to_value(&result)?;
        if let Value::Object(map) = &mut value {
            map.insert("workflow".to_string(), graph);
            map.insert(
                "metadata".to_string(),
                json!({
                    "model": model,
                    "checkpoint": model.checkpoint(),
                    "outputSize": size.to_string(),
                    "steps": steps,
                    "seed": seed,
                }),
            );
            map.insert(
                "usageInstructions".to_string(),
                Value::String(USAGE_INSTRUCTIONS.to_string()),
            );
        }
        Ok(value)
    }
}
