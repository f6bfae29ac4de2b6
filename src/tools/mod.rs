//! Tools available to the specialized agents
//!
//! Each tool describes itself through [`ToolMetadata`] so the agent prompt can
//! list it, validates its JSON arguments, and reports success or failure as a
//! [`ToolResult`] the agent feeds back to the model as an observation.

pub mod datetime;
pub mod executor;
pub mod registry;
pub mod stock;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::config::ToolsConfig;

/// Tool parameter schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

/// Tool metadata - describes what the tool does and how to use it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl fmt::Display for ToolMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;

    /// Execute the tool with JSON arguments produced by the model
    async fn execute(&self, args: Value) -> Result<ToolResult>;

    /// Validate arguments before execution
    fn validate(&self, _args: &Value) -> Result<()> {
        Ok(())
    }
}

/// Tool execution configuration
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub timeout_secs: u64,
    /// Attempts per call, at least one
    pub max_retries: u32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self::from(&ToolsConfig::default())
    }
}

impl From<&ToolsConfig> for ToolConfig {
    fn from(config: &ToolsConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}
