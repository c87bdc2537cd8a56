//! Read-only projections of the taxonomy store.

use super::{parse_args, McpTool, ToolContext};
use crate::types::ToolError;
use floral_taxonomy::{TaxonomyCategory, TaxonomyEntry, TaxonomyStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct EntryGroup<'a> {
    group: &'a str,
    entries: Vec<&'a TaxonomyEntry>,
}

/// Entries grouped by `group`, groups in order of first appearance.
fn grouped<'a>(entries: impl IntoIterator<Item = &'a TaxonomyEntry>) -> Vec<EntryGroup<'a>> {
    let mut groups: Vec<EntryGroup<'a>> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|g| g.group == entry.group) {
            Some(group) => group.entries.push(entry),
            None => groups.push(EntryGroup {
                group: &entry.group,
                entries: vec![entry],
            }),
        }
    }
    groups
}

fn category_listing(store: &TaxonomyStore, category: TaxonomyCategory) -> Result<Value, ToolError> {
    let entries = store.all_entries(category);
    Ok(json!({
        "category": category,
        "count": entries.len(),
        "groups": serde_json::to_value(grouped(entries))?,
    }))
}

fn no_arguments() -> Value {
    json!({"type": "object", "properties": {}})
}

pub struct ListArrangementStylesTool;

impl McpTool for ListArrangementStylesTool {
    fn name(&self) -> &'static str {
        "list_arrangement_styles"
    }

    fn description(&self) -> &'static str {
        "List arrangement styles grouped by family (ikebana, western classical, contemporary) \
         with container, characteristics, balance and complexity"
    }

    fn input_schema(&self) -> Value {
        no_arguments()
    }

    fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        category_listing(ctx.pipeline.store(), TaxonomyCategory::Style)
    }
}

pub struct ListFlowersByRoleTool;

#[derive(Debug, Default, Deserialize)]
struct FlowersArgs {
    #[serde(default)]
    role: Option<String>,
}

impl McpTool for ListFlowersByRoleTool {
    fn name(&self) -> &'static str {
        "list_flowers_by_role"
    }

    fn description(&self) -> &'static str {
        "List flowers by their role in an arrangement (focal, line, filler, texture); \
         omit the role to get every role"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "role": {
                    "type": "string",
                    "enum": ["focal", "line", "filler", "texture"],
                    "description": "Only flowers with exactly this role, in catalog order"
                }
            }
        })
    }

    fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: FlowersArgs = parse_args(args)?;
        let store = ctx.pipeline.store();

        match args.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(role) => {
                let flowers = store.flowers_by_role(role);
                let mut value = json!({
                    "role": role,
                    "count": flowers.len(),
                    "flowers": serde_json::to_value(&flowers)?,
                });
                if flowers.is_empty() {
                    value["available_roles"] = json!(store.flower_roles());
                }
                Ok(value)
            }
            None => {
                let roles: Vec<Value> = store
                    .flower_roles()
                    .iter()
                    .map(|role| -> Result<Value, ToolError> {
                        let flowers = store.flowers_by_role(role);
                        Ok(json!({
                            "role": role,
                            "count": flowers.len(),
                            "flowers": serde_json::to_value(&flowers)?,
                        }))
                    })
                    .collect::<Result<_, ToolError>>()?;
                Ok(json!({
                    "count": store.all_entries(TaxonomyCategory::FlowerRole).len(),
                    "roles": roles,
                }))
            }
        }
    }
}

pub struct ListColorPalettesTool;

impl McpTool for ListColorPalettesTool {
    fn name(&self) -> &'static str {
        "list_color_palettes"
    }

    fn description(&self) -> &'static str {
        "List color palettes grouped by color theory, mood and season, with colors and effect"
    }

    fn input_schema(&self) -> Value {
        no_arguments()
    }

    fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        category_listing(ctx.pipeline.store(), TaxonomyCategory::Palette)
    }
}

pub struct ListFoliageTypesTool;

impl McpTool for ListFoliageTypesTool {
    fn name(&self) -> &'static str {
        "list_foliage_types"
    }

    fn description(&self) -> &'static str {
        "List foliage grouped as structural, accent and dramatic, with varieties and uses"
    }

    fn input_schema(&self) -> Value {
        no_arguments()
    }

    fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        category_listing(ctx.pipeline.store(), TaxonomyCategory::Foliage)
    }
}

pub struct GetCulturalTraditionsTool;

impl McpTool for GetCulturalTraditionsTool {
    fn name(&self) -> &'static str {
        "get_cultural_traditions"
    }

    fn description(&self) -> &'static str {
        "Describe the cultural traditions of floral design with their philosophy and principles"
    }

    fn input_schema(&self) -> Value {
        no_arguments()
    }

    fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let traditions = ctx.pipeline.store().all_entries(TaxonomyCategory::Tradition);
        Ok(json!({
            "count": traditions.len(),
            "traditions": serde_json::to_value(traditions)?,
        }))
    }
}

pub struct GetStructuralTechniquesTool;

impl McpTool for GetStructuralTechniquesTool {
    fn name(&self) -> &'static str {
        "get_structural_techniques"
    }

    fn description(&self) -> &'static str {
        "Structural techniques by aspect: balance, proportion, focal points, movement, \
         texture and density"
    }

    fn input_schema(&self) -> Value {
        no_arguments()
    }

    fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        category_listing(ctx.pipeline.store(), TaxonomyCategory::Technique)
    }
}
