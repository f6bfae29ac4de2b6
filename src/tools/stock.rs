//! Market data tools
//!
//! Both tools query a Yahoo-Finance-style chart endpoint
//! (`{base}/v8/finance/chart/{ticker}?range=..&interval=..`):
//! - `stock_price` reports the latest regular-market price from the metadata
//! - `historical_prices` lists closing prices over a period

use super::{Tool, ToolMetadata, ToolParameter, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

static TICKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9.\-^=]{1,15}$").unwrap());

const PERIODS: &[&str] = &["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"];
const INTERVALS: &[&str] = &[
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

/// Most recent points kept in a history listing
const MAX_POINTS: usize = 100;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: QuoteMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteMeta {
    symbol: String,
    currency: Option<String>,
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResult {
    /// `(timestamp, close)` pairs, skipping points without a close
    fn closes(&self) -> Vec<(i64, f64)> {
        let closes = self
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .map(|q| q.close.as_slice())
            .unwrap_or_default();

        self.timestamp
            .as_deref()
            .unwrap_or_default()
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| close.map(|c| (*ts, c)))
            .collect()
    }
}

/// HTTP access to the chart endpoint shared by both tools
struct ChartClient {
    client: Client,
    base_url: String,
}

impl ChartClient {
    fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("teamchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one chart. The inner `Err` is a failure to report to the model.
    async fn fetch(
        &self,
        ticker: &str,
        range: &str,
        interval: &str,
    ) -> Result<std::result::Result<ChartResult, String>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);

        let response = self
            .client
            .get(&url)
            .query(&[("interval", interval), ("range", range)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Err(format!("ticker {} not found", ticker)));
        }
        if !status.is_success() {
            return Ok(Err(format!("quote service returned status {}", status)));
        }

        let envelope: ChartEnvelope = response.json().await?;
        if let Some(error) = envelope.chart.error {
            return Ok(Err(format!(
                "ticker {} not found: {}",
                ticker,
                error.description.unwrap_or_default()
            )));
        }

        Ok(envelope
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| format!("ticker {} not found", ticker)))
    }
}

fn ticker(args: &Value) -> Result<&str> {
    let ticker = args["ticker"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("'ticker' parameter is required and must be a string"))?;
    if !TICKER.is_match(ticker) {
        return Err(anyhow::anyhow!("'{}' is not a valid ticker symbol", ticker));
    }
    Ok(ticker)
}

fn ticker_parameter() -> ToolParameter {
    ToolParameter {
        name: "ticker".to_string(),
        param_type: "string".to_string(),
        description: "Ticker symbol, e.g. AAPL or BTC-USD".to_string(),
        required: true,
    }
}

pub struct StockPriceTool {
    chart: ChartClient,
}

impl StockPriceTool {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            chart: ChartClient::new(base_url, timeout_secs),
        }
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "stock_price".to_string(),
            description: "Get the latest market price for a stock or crypto ticker symbol."
                .to_string(),
            parameters: vec![ticker_parameter()],
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        ticker(args).map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let ticker = ticker(&args)?.to_uppercase();
        tracing::info!("Fetching quote for {}", ticker);

        let meta = match self.chart.fetch(&ticker, "1d", "1d").await? {
            Ok(result) => result.meta,
            Err(failure) => return Ok(ToolResult::failure(failure)),
        };

        match meta.regular_market_price {
            Some(price) => Ok(ToolResult::success(format!(
                "{}: {:.2} {}",
                meta.symbol,
                price,
                meta.currency.unwrap_or_default()
            )
            .trim_end()
            .to_string())),
            None => Ok(ToolResult::failure(format!(
                "no market price available for {}",
                meta.symbol
            ))),
        }
    }
}

pub struct HistoricalPricesTool {
    chart: ChartClient,
}

impl HistoricalPricesTool {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            chart: ChartClient::new(base_url, timeout_secs),
        }
    }

    fn choice<'a>(
        args: &'a Value,
        key: &str,
        default: &'a str,
        allowed: &[&str],
    ) -> Result<&'a str> {
        let value = match &args[key] {
            Value::Null => default,
            Value::String(s) => s.as_str(),
            _ => return Err(anyhow::anyhow!("'{}' must be a string", key)),
        };
        if !allowed.contains(&value) {
            return Err(anyhow::anyhow!(
                "'{}' is not a valid {}; expected one of {}",
                value,
                key,
                allowed.join(", ")
            ));
        }
        Ok(value)
    }

    fn period(args: &Value) -> Result<&str> {
        Self::choice(args, "period", "1mo", PERIODS)
    }

    fn interval(args: &Value) -> Result<&str> {
        Self::choice(args, "interval", "1d", INTERVALS)
    }
}

fn format_timestamp(ts: i64, intraday: bool) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(at) if intraday => at.format("%Y-%m-%d %H:%M").to_string(),
        Some(at) => at.format("%Y-%m-%d").to_string(),
        None => ts.to_string(),
    }
}

#[async_trait]
impl Tool for HistoricalPricesTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "historical_prices".to_string(),
            description: "Get closing prices for a stock or crypto ticker over a period."
                .to_string(),
            parameters: vec![
                ticker_parameter(),
                ToolParameter {
                    name: "period".to_string(),
                    param_type: "string".to_string(),
                    description: format!(
                        "How far back to look (default 1mo): {}",
                        PERIODS.join(", ")
                    ),
                    required: false,
                },
                ToolParameter {
                    name: "interval".to_string(),
                    param_type: "string".to_string(),
                    description: format!(
                        "Spacing between points (default 1d): {}",
                        INTERVALS.join(", ")
                    ),
                    required: false,
                },
            ],
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        ticker(args)?;
        Self::period(args)?;
        Self::interval(args)?;
        Ok(())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let ticker = ticker(&args)?.to_uppercase();
        let period = Self::period(&args)?;
        let interval = Self::interval(&args)?;
        tracing::info!("Fetching {} history for {} at {}", period, ticker, interval);

        let result = match self.chart.fetch(&ticker, period, interval).await? {
            Ok(result) => result,
            Err(failure) => return Ok(ToolResult::failure(failure)),
        };

        let closes = result.closes();
        if closes.is_empty() {
            return Ok(ToolResult::failure(format!(
                "no price history available for {}",
                result.meta.symbol
            )));
        }

        let intraday = interval.ends_with('m') || interval.ends_with('h');
        let skipped = closes.len().saturating_sub(MAX_POINTS);
        let mut output = format!(
            "{} closing prices ({}, {} interval{}):",
            result.meta.symbol,
            period,
            interval,
            result
                .meta
                .currency
                .as_deref()
                .map(|c| format!(", {}", c))
                .unwrap_or_default()
        );
        if skipped > 0 {
            output.push_str(&format!(
                "\n(showing the latest {} of {} points)",
                MAX_POINTS,
                closes.len()
            ));
        }
        for (ts, close) in &closes[skipped..] {
            output.push_str(&format!("\n{}: {:.2}", format_timestamp(*ts, intraday), close));
        }

        Ok(ToolResult::success(output))
    }
}
