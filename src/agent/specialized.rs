//! Specialized Agent - one member of the team
//!
//! Runs a bounded think → act → observe loop: the model answers with a JSON
//! decision, the agent executes the requested tool and feeds the observation
//! back until the model marks its answer final.

use super::{extract_json, Agent, AgentError};
use crate::config::Settings;
use crate::core::llm::{ChatMessage, LLMClient, ResponseFormat};
use crate::tools::{executor::ToolExecutor, registry::ToolRegistry, Tool, ToolConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct SpecializedAgentConfig {
    pub name: String,
    pub description: String,
    /// Persona and rules, placed ahead of the tool listing in the system prompt
    pub instructions: Vec<String>,
    pub tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for SpecializedAgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecializedAgentConfig")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("instructions", &self.instructions)
            .field("tools_count", &self.tools.len())
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct AgentDecision {
    #[serde(default)]
    thought: String,
    #[serde(default)]
    action: Option<AgentAction>,
    #[serde(default)]
    is_final: bool,
    #[serde(default, deserialize_with = "deserialize_final_answer")]
    final_answer: Option<String>,
}

/// Accepts either a string or any JSON value (pretty-printed)
fn deserialize_final_answer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => serde_json::to_string_pretty(&other)
            .map(Some)
            .map_err(Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct AgentAction {
    tool: String,
    #[serde(default)]
    input: Value,
}

pub struct SpecializedAgent {
    config: SpecializedAgentConfig,
    llm_client: LLMClient,
    tool_registry: ToolRegistry,
    tool_executor: ToolExecutor,
    max_iterations: usize,
}

impl SpecializedAgent {
    pub fn new(config: SpecializedAgentConfig, settings: &Settings, api_key: String) -> Self {
        let mut tool_registry = ToolRegistry::new();
        for tool in &config.tools {
            tool_registry.register(Arc::clone(tool));
        }

        Self {
            config,
            llm_client: LLMClient::new(api_key, settings),
            tool_registry,
            tool_executor: ToolExecutor::new(ToolConfig::from(&settings.tools)),
            max_iterations: settings.agent.max_iterations.max(1),
        }
    }

    /// Names of the registered tools, in registration order
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_registry
            .list_tools()
            .into_iter()
            .map(|tool| tool.name)
            .collect()
    }

    fn system_prompt(&self) -> String {
        format!(
            "{}\n\nAvailable Tools:\n{}\n\n\
             You have at most {} steps.\n\
             Respond with a JSON object in this EXACT format:\n\
             {{\n  \
               \"thought\": \"your reasoning about what to do next\",\n  \
               \"action\": {{\"tool\": \"tool_name\", \"input\": {{\"param\": \"value\"}}}},\n  \
               \"is_final\": false,\n  \
               \"final_answer\": null\n\
             }}\n\n\
             If you can answer without a tool, or an observation already contains \
             what the user asked for, set \"is_final\": true, \"action\": null and \
             put the reply to the user in \"final_answer\".\n\
             Do NOT repeat an action whose result you already have.\n\
             Respond with valid JSON only. No extra text.",
            self.config.instructions.join("\n"),
            self.tool_registry.tools_description(),
            self.max_iterations
        )
    }

    async fn think(&self, conversation: &[ChatMessage]) -> Result<AgentDecision, AgentError> {
        let response = self
            .llm_client
            .chat_with_format(conversation, Some(ResponseFormat::JsonObject))
            .await
            .map_err(AgentError::Llm)?;

        Ok(extract_json(&response).unwrap_or_else(|| {
            // A model that ignores the format is usually just answering
            tracing::debug!(
                "[{}] Reply was not a JSON decision, treating it as the answer",
                self.config.name
            );
            AgentDecision {
                thought: String::new(),
                action: None,
                is_final: true,
                final_answer: Some(response),
            }
        }))
    }

    async fn observe(&self, action: &AgentAction) -> String {
        let tool = match self.tool_registry.get(&action.tool) {
            Some(tool) => tool,
            None => return format!("Tool '{}' not found", action.tool),
        };

        match self.tool_executor.execute(tool, action.input.clone()).await {
            Ok(result) if result.success => result.output,
            Ok(result) => format!("Tool failed: {}", result.error.unwrap_or_default()),
            Err(e) => {
                tracing::error!("[{}] Tool execution error: {}", self.config.name, e);
                format!("Tool execution failed: {}", e)
            }
        }
    }
}

#[async_trait]
impl Agent for SpecializedAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    async fn respond(&self, message: &str, history: &[ChatMessage]) -> Result<String, AgentError> {
        let mut conversation = Vec::with_capacity(history.len() + 2);
        conversation.push(ChatMessage::system(self.system_prompt()));
        conversation.extend_from_slice(history);
        conversation.push(ChatMessage::user(message));

        for iteration in 0..self.max_iterations {
            tracing::debug!(
                "[{}] Iteration {}/{}",
                self.config.name,
                iteration + 1,
                self.max_iterations
            );

            let decision = self.think(&conversation).await?;
            tracing::debug!("[{}] Thought: {}", self.config.name, decision.thought);

            let action = match decision.action.clone() {
                Some(action) if !decision.is_final => action,
                _ => {
                    if let Some(answer) = decision
                        .final_answer
                        .as_deref()
                        .filter(|a| !a.trim().is_empty())
                    {
                        return Ok(answer.to_string());
                    }
                    if decision.is_final && !decision.thought.trim().is_empty() {
                        return Ok(decision.thought);
                    }

                    conversation.push(ChatMessage::assistant(
                        serde_json::to_string(&decision).unwrap_or_default(),
                    ));
                    conversation.push(ChatMessage::user(
                        "You gave neither an action nor a final_answer. \
                         Either call a tool or set is_final=true with a final_answer.",
                    ));
                    continue;
                }
            };

            tracing::info!("[{}] Executing tool: {}", self.config.name, action.tool);
            let observation = self.observe(&action).await;
            tracing::debug!("[{}] Observation: {}", self.config.name, observation);

            conversation.push(ChatMessage::assistant(
                serde_json::to_string(&decision)
                    .unwrap_or_else(|_| format!("Action: {}", action.tool)),
            ));
            conversation.push(ChatMessage::user(format!(
                "Observation: {}\n\n{} steps remaining. If this answers the original \
                 message, set is_final=true and give the final_answer.",
                observation,
                self.max_iterations - iteration - 1
            )));
        }

        Err(AgentError::Incomplete {
            agent: self.config.name.clone(),
            iterations: self.max_iterations,
        })
    }
}
