//! Realistic fakes for the four collaborator traits, grounded on
//! `tirds-agents::test_support::ScenarioMockSpecialist`: fakes interpret the
//! shape of the request (symbol, prompt content) with domain-aware rules
//! rather than returning one canned value regardless of input.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_models::{AccountState, Bar, NewsArticle, Position};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::collaborators::{
    Alert, AlertSink, Broker, MarketStatus, Model, NewsProvider, Order, OrderSide, OrderStatus,
};
use crate::error::PromptingError;

/// A Broker fake backed by a fixed account snapshot and a bar series per
/// symbol, with orders recorded for assertions rather than actually filled.
pub struct FakeBroker {
    account: Mutex<AccountState>,
    bars: HashMap<String, Vec<Bar>>,
    pub orders: Mutex<Vec<Order>>,
    pub is_paper: bool,
}

impl FakeBroker {
    pub fn new(account: AccountState, is_paper: bool) -> Self {
        Self {
            account: Mutex::new(account),
            bars: HashMap::new(),
            orders: Mutex::new(Vec::new()),
            is_paper,
        }
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.into(), bars);
        self
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn get_account(&self) -> Result<AccountState, PromptingError> {
        Ok(self.account.lock().unwrap().clone())
    }

    async fn get_positions(&self) -> Result<Vec<Position>, PromptingError> {
        Ok(self.account.lock().unwrap().positions.clone())
    }

    async fn get_bars(
        &self,
        symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _timeframe: &str,
    ) -> Result<Vec<Bar>, PromptingError> {
        Ok(self.bars.get(symbol).cloned().unwrap_or_default())
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<Decimal, PromptingError> {
        self.bars
            .get(symbol)
            .and_then(|bars| bars.last())
            .map(|b| b.close)
            .ok_or_else(|| PromptingError::Model(format!("no bars for {symbol}")))
    }

    async fn get_market_status(&self) -> Result<MarketStatus, PromptingError> {
        Ok(MarketStatus { is_open: true })
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        qty: u64,
        side: OrderSide,
    ) -> Result<Order, PromptingError> {
        let fill_price = self.get_latest_price(symbol).await.ok();
        let order = Order {
            order_id: format!("fake-{}-{}", symbol, self.orders.lock().unwrap().len()),
            symbol: symbol.to_string(),
            qty,
            side,
            status: OrderStatus::Filled,
            fill_price,
        };
        self.orders.lock().unwrap().push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, PromptingError> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned()
            .ok_or_else(|| PromptingError::Model(format!("no such order {order_id}")))
    }

    async fn is_paper_account(&self) -> Result<bool, PromptingError> {
        Ok(self.is_paper)
    }
}

/// A Model fake that inspects the prompt for a symbol's technical signal
/// keywords and replies with a matching STANDARD_DECISION-shaped JSON
/// object, rather than a single canned response.
pub struct ScenarioModel {
    name: String,
}

impl ScenarioModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Model for ScenarioModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, PromptingError> {
        let lower = prompt.to_lowercase();
        let (action, confidence, sentiment) = if lower.contains("oversold") || lower.contains("bullish") {
            ("buy", 70, "bullish")
        } else if lower.contains("overbought") || lower.contains("bearish") {
            ("sell", 65, "bearish")
        } else {
            ("hold", 55, "neutral")
        };

        Ok(serde_json::json!({
            "action": action,
            "confidence": confidence,
            "sentiment": sentiment,
            "reasoning": format!("Synthesized from the signal keywords present in the prompt (action={action})"),
            "risk_factors": [],
        })
        .to_string())
    }
}

/// A NewsProvider fake returning a fixed article set per symbol.
pub struct FakeNewsProvider {
    articles: HashMap<String, Vec<NewsArticle>>,
}

impl FakeNewsProvider {
    pub fn new() -> Self {
        Self {
            articles: HashMap::new(),
        }
    }

    pub fn with_articles(mut self, symbol: impl Into<String>, articles: Vec<NewsArticle>) -> Self {
        self.articles.insert(symbol.into(), articles);
        self
    }
}

impl Default for FakeNewsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NewsProvider for FakeNewsProvider {
    async fn get_news(
        &self,
        symbols: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<NewsArticle>, PromptingError> {
        Ok(symbols
            .iter()
            .flat_map(|s| self.articles.get(s).cloned().unwrap_or_default())
            .filter(|a| a.timestamp >= since)
            .collect())
    }
}

/// An AlertSink fake recording every alert for assertions.
pub struct RecordingAlertSink {
    pub alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
        }
    }
}

impl Default for RecordingAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn alert(&self, alert: Alert) -> Result<(), PromptingError> {
        self.alerts.lock().unwrap().push(alert);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scenario_model_reacts_to_oversold_keyword() {
        let model = ScenarioModel::new("fake-llama");
        let response = model.complete("RSI is oversold at 24").await.unwrap();
        assert!(response.contains("\"action\":\"buy\"") || response.contains("\"action\": \"buy\""));
    }

    #[tokio::test]
    async fn fake_broker_rejects_non_paper_probe() {
        let broker = FakeBroker::new(
            AccountState {
                equity: Decimal::ZERO,
                cash: Decimal::ZERO,
                buying_power: Decimal::ZERO,
                daytime_trades_used: 0,
                positions: vec![],
                timestamp: Utc::now(),
            },
            false,
        );
        assert!(!broker.is_paper_account().await.unwrap());
    }
}
