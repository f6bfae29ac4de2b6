use super::{Tool, ToolMetadata, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

/// Reports the current local date and time
pub struct CurrentDatetimeTool;

impl CurrentDatetimeTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrentDatetimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentDatetimeTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "current_datetime".to_string(),
            description: "Return the current local date and time in RFC 3339 format.".to_string(),
            parameters: vec![],
        }
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        Ok(ToolResult::success(Local::now().to_rfc3339()))
    }
}
