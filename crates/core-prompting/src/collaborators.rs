//! Async traits for every external system the Decision Core talks to
//! (spec §6). Grounded on `tirds-agents::specialist::SpecialistAgent`'s
//! `#[async_trait] trait { fn name/domain(&self); async fn evaluate(...) }`
//! shape: a small set of named methods a fake can implement without pulling
//! in the real transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_models::{AccountState, Bar, NewsArticle, Position};

use crate::error::PromptingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub qty: u64,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub fill_price: Option<rust_decimal::Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStatus {
    pub is_open: bool,
}

/// The remote brokerage. Paper-trading only — callers must verify
/// `is_paper_account()` at startup and refuse to proceed otherwise (spec §6).
#[async_trait]
pub trait Broker: Send + Sync {
    async fn get_account(&self) -> Result<AccountState, PromptingError>;
    async fn get_positions(&self) -> Result<Vec<Position>, PromptingError>;
    async fn get_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: &str,
    ) -> Result<Vec<Bar>, PromptingError>;
    async fn get_latest_price(&self, symbol: &str) -> Result<rust_decimal::Decimal, PromptingError>;
    async fn get_market_status(&self) -> Result<MarketStatus, PromptingError>;
    async fn place_market_order(
        &self,
        symbol: &str,
        qty: u64,
        side: OrderSide,
    ) -> Result<Order, PromptingError>;
    async fn get_order(&self, order_id: &str) -> Result<Order, PromptingError>;
    /// Startup probe: the Core refuses to initialize against a non-paper
    /// endpoint (spec §6).
    async fn is_paper_account(&self) -> Result<bool, PromptingError>;
}

/// A local LLM HTTP endpoint. Request is a text prompt; response is text —
/// the Core treats model identity as an opaque string, per spec §6.
#[async_trait]
pub trait Model: Send + Sync {
    /// Stable identifier logged with every interaction (spec §6: "Core
    /// treats model identity as an opaque string and logs it per interaction").
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, PromptingError>;
}

/// Same contract shape as `Broker::get_news`; may be backed by the Broker
/// itself or a separate news service (spec §6).
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn get_news(
        &self,
        symbols: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<NewsArticle>, PromptingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
}

/// Out-of-scope transport per spec §1 ("any email/Slack alerting
/// transport"); only the contract is pinned here. A `LoggingAlertSink`
/// default implementation lives in [`crate::logging_alert_sink`].
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn alert(&self, alert: Alert) -> Result<(), PromptingError>;
}
