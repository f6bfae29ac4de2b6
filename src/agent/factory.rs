use super::{AgentTeam, SpecializedAgent, SpecializedAgentConfig};
use crate::config::Settings;
use crate::core::llm::LLMClient;
use crate::tools::datetime::CurrentDatetimeTool;
use crate::tools::stock::{HistoricalPricesTool, StockPriceTool};
use crate::tools::Tool;
use std::sync::Arc;

pub const STOCK_DATETIME_AGENT: &str = "stock_datetime_agent";
pub const GENERAL_QUERY_AGENT: &str = "general_query_agent";

fn stock_datetime_agent(settings: &Settings, api_key: String) -> SpecializedAgent {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(CurrentDatetimeTool::new()),
        Arc::new(StockPriceTool::new(
            settings.tools.quote_base_url.clone(),
            settings.tools.timeout_secs,
        )),
        Arc::new(HistoricalPricesTool::new(
            settings.tools.quote_base_url.clone(),
            settings.tools.timeout_secs,
        )),
    ];

    SpecializedAgent::new(
        SpecializedAgentConfig {
            name: STOCK_DATETIME_AGENT.to_string(),
            description: "Handles stock and crypto prices, price history and the current date/time"
                .to_string(),
            instructions: vec![
                "You are a stocks & time assistant. You answer only two kinds of questions:".to_string(),
                "1) The current date and time.".to_string(),
                "2) The latest price, or the price history, of a stock or crypto ticker symbol."
                    .to_string(),
                "For anything else, politely decline and say you can only help with the date/time or prices.".to_string(),
                "Format answers in markdown.".to_string(),
            ],
            tools,
        },
        settings,
        api_key,
    )
}

fn general_query_agent(settings: &Settings, api_key: String) -> SpecializedAgent {
    SpecializedAgent::new(
        SpecializedAgentConfig {
            name: GENERAL_QUERY_AGENT.to_string(),
            description: "Handles every other question".to_string(),
            instructions: vec![
                "You are a general question-answering assistant.".to_string(),
                "Answer in structured paragraphs with details, analysis and a conclusion.".to_string(),
                "Use markdown tables where the information is tabular.".to_string(),
            ],
            tools: Vec::new(),
        },
        settings,
        api_key,
    )
}

/// The two-member team behind every surface: stock/crypto/date-time questions
/// go to [`STOCK_DATETIME_AGENT`], everything else to [`GENERAL_QUERY_AGENT`].
pub fn build_default_team(settings: &Settings, api_key: String) -> AgentTeam {
    let members: Vec<Arc<dyn super::Agent>> = vec![
        Arc::new(stock_datetime_agent(settings, api_key.clone())),
        Arc::new(general_query_agent(settings, api_key.clone())),
    ];

    AgentTeam::new(
        "agent_team",
        members,
        GENERAL_QUERY_AGENT,
        LLMClient::new(api_key, settings),
    )
    .with_routing_rules(vec![
        format!("- Stock, crypto or date/time questions go to {} only.", STOCK_DATETIME_AGENT),
        format!("- All other questions go to {} only.", GENERAL_QUERY_AGENT),
    ])
}
