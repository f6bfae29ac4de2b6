//! Tool Registry
//!
//! Keeps registration order so the tool listing in agent prompts is stable.

use super::{Tool, ToolMetadata};
use std::sync::Arc;

pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, replacing any tool registered under the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name;
        tracing::debug!("Registering tool: {}", name);
        self.tools.retain(|existing| existing.metadata().name != name);
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|tool| tool.metadata().name == name)
            .cloned()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.tools.iter().map(|tool| tool.metadata()).collect()
    }

    /// Tool metadata formatted for LLM prompts
    pub fn tools_description(&self) -> String {
        if self.tools.is_empty() {
            return "(none)".to_string();
        }

        self.tools
            .iter()
            .map(|tool| {
                let metadata = tool.metadata();
                let params = metadata
                    .parameters
                    .iter()
                    .map(|p| {
                        let required = if p.required { "required" } else { "optional" };
                        format!(
                            "  - {} ({}): {} [{}]",
                            p.name, p.param_type, p.description, required
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                format!(
                    "Tool: {}\nDescription: {}\nParameters:\n{}",
                    metadata.name, metadata.description, params
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
