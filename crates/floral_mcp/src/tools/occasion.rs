//! suggest_flowers_for_occasion - flower-only matching plus the occasion's
//! reference recommendations.

use super::{require_param, McpTool, ToolContext};
use crate::types::ToolError;
use floral_taxonomy::TaxonomyCategory;
use serde_json::{json, Value};
use tracing::debug;

pub struct SuggestFlowersForOccasionTool;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 24;

impl McpTool for SuggestFlowersForOccasionTool {
    fn name(&self) -> &'static str {
        "suggest_flowers_for_occasion"
    }

    fn description(&self) -> &'static str {
        "Suggest flowers for an occasion (wedding, funeral, celebration, everyday or a \
         setting such as 'reception' or 'get well'), with arrangement recommendations"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "occasion": {
                    "type": "string",
                    "description": "Occasion or setting, e.g. 'wedding', 'sympathy', 'birthday'"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_LIMIT,
                    "default": DEFAULT_LIMIT,
                    "description": "Maximum number of flowers"
                }
            },
            "required": ["occasion"]
        })
    }

    fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let occasion = require_param!(args, "occasion", String);
        let limit = match args.get("limit") {
            Some(Value::Null) | None => DEFAULT_LIMIT,
            Some(_) => require_param!(args, "limit", usize).clamp(1, MAX_LIMIT),
        };

        let store = ctx.pipeline.store();
        let flowers = ctx
            .pipeline
            .suggest(TaxonomyCategory::FlowerRole, &occasion, limit);
        let known = store.find_occasion(&occasion);
        debug!(
            occasion = %occasion,
            matched = known.map(|o| o.id.as_str()).unwrap_or("-"),
            flowers = flowers.len(),
            "Suggested flowers"
        );

        let mut value = json!({
            "occasion": occasion,
            "flowers": serde_json::to_value(&flowers)?,
        });
        match known {
            Some(found) => {
                value["matched_occasion"] = Value::String(found.id.clone());
                value["recommendations"] = serde_json::to_value(found)?;
            }
            None => {
                value["matched_occasion"] = Value::Null;
                value["available_occasions"] =
                    json!(store.occasions().iter().map(|o| o.id.as_str()).collect::<Vec<_>>());
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floral_intent::{IntentPipeline, PipelineConfig};
    use floral_taxonomy::TaxonomyStore;
    use std::sync::Arc;

    fn ctx() -> ToolContext {
        ToolContext {
            pipeline: Arc::new(IntentPipeline::new(
                Arc::new(TaxonomyStore::bundled().unwrap()),
                PipelineConfig::default(),
            )),
            server_name: "floral-mcp".to_string(),
            server_version: "test".to_string(),
            tool_names: Vec::new(),
        }
    }

    #[test]
    fn test_known_occasion_has_recommendations() {
        let value = SuggestFlowersForOccasionTool
            .execute(json!({"occasion": "wedding"}), &ctx())
            .unwrap();
        assert_eq!(value["matched_occasion"], "wedding");
        assert!(!value["recommendations"]["settings"].as_array().unwrap().is_empty());

        let flowers = value["flowers"].as_array().unwrap();
        assert!(!flowers.is_empty() && flowers.len() <= DEFAULT_LIMIT);
        let store = TaxonomyStore::bundled().unwrap();
        for flower in flowers {
            let id = flower["id"].as_str().unwrap();
            assert!(store.lookup(TaxonomyCategory::FlowerRole, id).is_some(), "{id}");
        }
    }

    #[test]
    fn test_unknown_occasion_still_suggests_flowers() {
        let value = SuggestFlowersForOccasionTool
            .execute(json!({"occasion": "graduation", "limit": 2}), &ctx())
            .unwrap();
        assert!(value["matched_occasion"].is_null());
        assert_eq!(value["flowers"].as_array().unwrap().len(), 2);
        assert_eq!(
            value["available_occasions"],
            json!(["wedding", "funeral", "celebration", "everyday"])
        );
    }

    #[test]
    fn test_occasion_required() {
        let err = SuggestFlowersForOccasionTool
            .execute(json!({}), &ctx())
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
