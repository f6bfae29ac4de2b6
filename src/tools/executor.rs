//! Tool Executor with timeout and retry

use super::{Tool, ToolConfig, ToolResult};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};

pub struct ToolExecutor {
    config: ToolConfig,
}

impl ToolExecutor {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// Execute a tool, retrying transient failures with exponential backoff.
    /// Invalid arguments are reported once and never retried.
    pub async fn execute(&self, tool: Arc<dyn Tool>, args: Value) -> Result<ToolResult> {
        let tool_name = tool.metadata().name;

        if let Err(e) = tool.validate(&args) {
            return Ok(ToolResult::failure(format!("validation failed: {}", e)));
        }

        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tracing::warn!(
                    "Retrying tool '{}' (attempt {}/{})",
                    tool_name,
                    attempt + 1,
                    attempts
                );
                sleep(Duration::from_millis(self.calculate_backoff(attempt))).await;
            }

            let run = timeout(
                Duration::from_secs(self.config.timeout_secs),
                tool.execute(args.clone()),
            )
            .await;

            match run {
                Ok(Ok(result)) if result.success => return Ok(result),
                Ok(Ok(result)) => {
                    if !self.should_retry(&result) {
                        return Ok(result);
                    }
                    last_error = result.error;
                }
                Ok(Err(e)) => last_error = Some(e.to_string()),
                Err(_) => {
                    last_error = Some(format!(
                        "timeout after {} seconds",
                        self.config.timeout_secs
                    ))
                }
            }
        }

        Ok(ToolResult::failure(format!(
            "Tool '{}' failed after {} attempts. Last error: {}",
            tool_name,
            attempts,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    fn calculate_backoff(&self, attempt: u32) -> u64 {
        let base_delay = 100;
        let max_delay = 5000;

        (base_delay * 2_u64.pow(attempt)).min(max_delay)
    }

    fn should_retry(&self, result: &ToolResult) -> bool {
        if let Some(ref error) = result.error {
            let error_lower = error.to_lowercase();

            if error_lower.contains("validation")
                || error_lower.contains("not found")
                || error_lower.contains("not allowed")
                || error_lower.contains("empty")
            {
                return false;
            }
        }

        true
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(ToolConfig::default())
    }
}
