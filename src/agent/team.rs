//! Agent Team - LLM intent classification and routing
//!
//! Each message is classified once and handed to exactly one member. A
//! decision that cannot be parsed, or that names an unknown member, goes to
//! the fallback member instead.

use super::{extract_json, Agent, AgentError};
use crate::core::llm::{ChatMessage, LLMClient, ResponseFormat};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize, Serialize)]
struct RoutingDecision {
    agent_name: String,
    #[serde(default)]
    reasoning: String,
}

pub struct AgentTeam {
    name: String,
    routing_rules: Vec<String>,
    members: Vec<Arc<dyn Agent>>,
    fallback: String,
    llm_client: LLMClient,
}

impl AgentTeam {
    /// `fallback` names the member that receives unroutable messages
    pub fn new(
        name: impl Into<String>,
        members: Vec<Arc<dyn Agent>>,
        fallback: impl Into<String>,
        llm_client: LLMClient,
    ) -> Self {
        Self {
            name: name.into(),
            routing_rules: Vec::new(),
            members,
            fallback: fallback.into(),
            llm_client,
        }
    }

    /// Extra routing guidance appended to the router prompt
    pub fn with_routing_rules(mut self, rules: Vec<String>) -> Self {
        self.routing_rules = rules;
        self
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name())
    }

    fn member(&self, name: &str) -> Option<&Arc<dyn Agent>> {
        self.members.iter().find(|m| m.name() == name)
    }

    fn router_prompt(&self) -> String {
        let agent_descriptions = self
            .members
            .iter()
            .map(|m| format!("- {}: {}", m.name(), m.description()))
            .collect::<Vec<_>>()
            .join("\n");

        let rules = if self.routing_rules.is_empty() {
            String::new()
        } else {
            format!("\n\nRouting rules:\n{}", self.routing_rules.join("\n"))
        };

        format!(
            "You are a router that decides which team member should answer the user's message.\n\n\
             Team members:\n{}{}\n\n\
             Respond with a JSON object in this EXACT format:\n\
             {{\n  \
               \"agent_name\": \"the_member_name\",\n  \
               \"reasoning\": \"why this member is the best choice\"\n\
             }}\n\n\
             Respond with valid JSON only. No extra text.",
            agent_descriptions, rules
        )
    }

    /// Earlier turns are included so follow-ups ("and for MSFT?") route
    /// like the message they follow.
    async fn classify(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<RoutingDecision, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.router_prompt()));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(format!("Message: {}", message)));

        let response = self
            .llm_client
            .chat_with_format(&messages, Some(ResponseFormat::JsonObject))
            .await
            .map_err(AgentError::Llm)?;

        Ok(extract_json(&response).unwrap_or_else(|| {
            tracing::warn!(
                "[{}] Could not parse routing decision, using '{}'",
                self.name,
                self.fallback
            );
            RoutingDecision {
                agent_name: self.fallback.clone(),
                reasoning: "unparsable routing decision".to_string(),
            }
        }))
    }
}

#[async_trait]
impl Agent for AgentTeam {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Routes each message to the best-suited team member"
    }

    async fn respond(&self, message: &str, history: &[ChatMessage]) -> Result<String, AgentError> {
        let decision = self.classify(message, history).await?;

        tracing::info!(
            "[{}] Routing to '{}' - Reason: {}",
            self.name,
            decision.agent_name,
            decision.reasoning
        );

        let member = match self.member(&decision.agent_name) {
            Some(member) => member,
            None => {
                tracing::warn!(
                    "[{}] Unknown member '{}', falling back to '{}'",
                    self.name,
                    decision.agent_name,
                    self.fallback
                );
                self.member(&self.fallback)
                    .ok_or_else(|| AgentError::NoRoute(decision.agent_name.clone()))?
            }
        };

        member.respond(message, history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Named(&'static str);

    #[async_trait]
    impl Agent for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test member"
        }

        async fn respond(
            &self,
            message: &str,
            history: &[ChatMessage],
        ) -> Result<String, AgentError> {
            Ok(format!("{} handled {} after {}", self.0, message, history.len()))
        }
    }

    async fn team_replying(server: &MockServer, router_reply: &str, fallback: &str) -> AgentTeam {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": router_reply}}]
            })))
            .mount(server)
            .await;

        let mut settings = Settings::default();
        settings.llm.endpoint = format!("{}/v1/chat/completions", server.uri());

        AgentTeam::new(
            "team",
            vec![Arc::new(Named("stocks")), Arc::new(Named("general"))],
            fallback,
            LLMClient::new("sk-test".to_string(), &settings),
        )
    }

    #[tokio::test]
    async fn test_routes_to_chosen_member() {
        let server = MockServer::start().await;
        let team = team_replying(
            &server,
            r#"{"agent_name": "stocks", "reasoning": "ticker"}"#,
            "general",
        )
        .await;

        assert_eq!(team.respond("AAPL?", &[]).await.unwrap(), "stocks handled AAPL? after 0");
    }

    #[tokio::test]
    async fn test_unparsable_decision_uses_fallback() {
        let server = MockServer::start().await;
        let team = team_replying(&server, "I think stocks would be best", "general").await;

        assert_eq!(team.respond("hm", &[]).await.unwrap(), "general handled hm after 0");
    }

    #[tokio::test]
    async fn test_unknown_member_uses_fallback() {
        let server = MockServer::start().await;
        let team = team_replying(&server, r#"{"agent_name": "weather"}"#, "general").await;

        assert_eq!(team.respond("rain?", &[]).await.unwrap(), "general handled rain? after 0");
    }

    #[tokio::test]
    async fn test_missing_fallback_is_no_route() {
        let server = MockServer::start().await;
        let team = team_replying(&server, r#"{"agent_name": "weather"}"#, "nobody").await;

        let err = team.respond("rain?", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::NoRoute(name) if name == "weather"));
    }

    #[tokio::test]
    async fn test_history_reaches_router_and_member() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("price of AAPL?"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": "{\"agent_name\": \"stocks\", \"reasoning\": \"follow-up\"}"
                }}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let team = team_replying(&server, r#"{"agent_name": "general"}"#, "general").await;

        let history = [
            ChatMessage::user("price of AAPL?"),
            ChatMessage::assistant("AAPL: 189.84 USD"),
        ];
        let reply = team.respond("and MSFT?", &history).await.unwrap();

        assert_eq!(reply, "stocks handled and MSFT? after 2");
    }
}
