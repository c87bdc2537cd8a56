//! Tool Registry - Tool Discovery and Dispatch

use super::*;
use crate::protocol::ToolDefinition;
use std::collections::BTreeMap;
use tracing::debug;

/// Registry of available MCP tools, keyed by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn McpTool>>,
}

impl ToolRegistry {
    /// Create a new tool registry with all tools registered
    pub fn new() -> Self {
        let mut registry = Self {
            tools: BTreeMap::new(),
        };

        registry.register(Box::new(enhance::EnhancePromptTool));
        registry.register(Box::new(workflow::GenerateWorkflowTool));
        registry.register(Box::new(reference::ListArrangementStylesTool));
        registry.register(Box::new(reference::ListFlowersByRoleTool));
        registry.register(Box::new(reference::ListColorPalettesTool));
        registry.register(Box::new(reference::ListFoliageTypesTool));
        registry.register(Box::new(reference::GetCulturalTraditionsTool));
        registry.register(Box::new(reference::GetStructuralTechniquesTool));
        registry.register(Box::new(occasion::SuggestFlowersForOccasionTool));
        registry.register(Box::new(info::ServerInfoTool));

        debug!("Registered {} tools", registry.tools.len());

        registry
    }

    fn register(&mut self, tool: Box<dyn McpTool>) {
        let name = tool.name().to_string();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// Definitions in name order.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Call a tool by name
    pub fn call_tool(&self, name: &str, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.execute(args, ctx)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
