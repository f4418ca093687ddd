//! TradingAgent (component J, spec §4.J): the per-cycle orchestrator that
//! refreshes account state, executes overnight-handoff sells first, reviews
//! existing holdings, then scans the watchlist for new opportunities —
//! wiring PromptAssembler, ResponseParser, and RiskGate around the Broker,
//! Model, and Store collaborators.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use core_models::{
    Action, AccountState, Decision, DetailLevel, ExecutionOutcome, ExpectedFormat, MarketState,
    OvernightSummary, Position, QueryContext, QueryType, Sentiment, TradingProfile, Trigger,
};
use core_prompting::{
    Alert, AlertSeverity, AlertSink, Broker, DataBundle, Model, OrderSide, ParsedResult,
    PromptAssembler, PromptingError, ProposedTrade, ResponseParser, RiskGate,
};
use core_store::{LlmInteraction, Store};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::CoreError;

/// Capital-constraint trigger threshold (spec §4.J step 1): buying power
/// below 5% of equity.
const CAPITAL_CONSTRAINT_RATIO: &str = "0.05";

/// Lookback window for the overnight-analysis store read (spec §4.J step 3
/// mirrors `OvernightAnalysis::is_actionable_sell`'s 18h recency check, but
/// the store query itself only needs to look back a day or two).
const OVERNIGHT_LOOKBACK_DAYS: i64 = 2;

/// BrokerUnavailable recovery policy (spec §7): 3 attempts, exponential
/// backoff starting at 500ms, before the error is let through to abort the
/// cycle.
const BROKER_RETRY_ATTEMPTS: u32 = 3;
const BROKER_RETRY_BASE_BACKOFF: Duration = Duration::from_millis(500);

async fn retry_broker_call<T, F, Fut>(mut call: F) -> Result<T, PromptingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PromptingError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < BROKER_RETRY_ATTEMPTS => {
                let backoff = BROKER_RETRY_BASE_BACKOFF * 2u32.pow(attempt - 1);
                warn!(attempt, error = %e, ?backoff, "broker call failed, retrying");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub struct TradingAgent {
    broker: Arc<dyn Broker>,
    model: Arc<dyn Model>,
    alert_sink: Arc<dyn AlertSink>,
    store: Arc<Store>,
    risk_gate: RiskGate,
    profile: TradingProfile,
    max_position_size_pct: i32,
    new_opportunity_budget: u32,
    watchlist: Vec<String>,
    fill_timeout: std::time::Duration,
    dry_run: bool,
    trades_executed_today: AtomicU32,
}

/// What one `run_cycle` call did, returned for logging by the caller (a
/// `TaskHandler` in `task_handlers.rs`).
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub decisions: Vec<Decision>,
    pub overnight_sells_handled: Vec<String>,
}

impl TradingAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker: Arc<dyn Broker>,
        model: Arc<dyn Model>,
        alert_sink: Arc<dyn AlertSink>,
        store: Arc<Store>,
        risk_gate: RiskGate,
        profile: TradingProfile,
        max_position_size_pct: i32,
        new_opportunity_budget: u32,
        watchlist: Vec<String>,
        fill_timeout: std::time::Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            broker,
            model,
            alert_sink,
            store,
            risk_gate,
            profile,
            max_position_size_pct,
            new_opportunity_budget,
            watchlist,
            fill_timeout,
            dry_run,
            trades_executed_today: AtomicU32::new(0),
        }
    }

    /// Called by the `DailySummary`/midnight rollover task to zero the
    /// trade-frequency counter RiskGate's `check_trade_frequency` consumes.
    pub fn reset_daily_counters(&self) {
        self.trades_executed_today.store(0, Ordering::SeqCst);
    }

    fn trades_executed_today(&self) -> u32 {
        self.trades_executed_today.load(Ordering::SeqCst)
    }

    async fn daily_drawdown_pct(&self, equity: Decimal) -> Result<Decimal, CoreError> {
        if equity.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let today = Utc::now().date_naive();
        match self.store.daily_performance(today).await? {
            Some(perf) if perf.pnl < Decimal::ZERO => {
                Ok((-perf.pnl / equity) * Decimal::from(100))
            }
            _ => Ok(Decimal::ZERO),
        }
    }

    /// Runs one full cycle (spec §4.J steps 1-6): refresh → overnight
    /// sell-first → position review → new-opportunity scan.
    pub async fn run_cycle(&self, market_state: MarketState) -> Result<CycleSummary, CoreError> {
        let mut account = retry_broker_call(|| self.broker.get_account()).await?;
        let capital_constraint: Decimal = CAPITAL_CONSTRAINT_RATIO.parse().unwrap_or_default();
        let trigger = if account.buying_power_ratio() < capital_constraint {
            Trigger::CapitalConstraint
        } else {
            Trigger::ScheduledCycle
        };

        // Step 2: snapshot which symbols are held at cycle start. Routing
        // (POSITION_REVIEW vs NEW_OPPORTUNITY) is a function of this
        // snapshot, never of a position opened mid-cycle.
        let held_at_start: Vec<String> = account
            .positions
            .iter()
            .filter(|p| p.is_held())
            .map(|p| p.symbol.clone())
            .collect();

        let mut decisions = Vec::new();
        let mut overnight_sells_handled = HashSet::new();

        // Step 3: overnight hand-off — execute actionable stored sells first.
        for symbol in &held_at_start {
            let Some(analysis) = self.store.read_most_recent_overnight_analysis(
                symbol,
                Utc::now().date_naive(),
                OVERNIGHT_LOOKBACK_DAYS,
            )?
            else {
                continue;
            };
            let min_sell = self.profile.thresholds().min_sell_confidence;
            if !analysis.is_actionable_sell(min_sell, Utc::now()) {
                continue;
            }
            let Some(position) = account.position_for(symbol).cloned() else {
                continue;
            };
            let decision = self
                .execute_overnight_sell(&position, &analysis, &account, market_state, trigger)
                .await?;
            decisions.push(decision);
            overnight_sells_handled.insert(symbol.clone());
            account = retry_broker_call(|| self.broker.get_account()).await?;
        }

        // Step 4: review remaining holdings.
        let overnight_summary = self.store.most_recent_overnight_summary()?;
        for symbol in &held_at_start {
            if overnight_sells_handled.contains(symbol) {
                continue;
            }
            if account.position_for(symbol).is_none() {
                continue;
            }
            if let Some(decision) = self
                .evaluate_symbol(
                    symbol,
                    QueryType::PositionReview,
                    trigger,
                    &account,
                    market_state,
                    overnight_summary.clone(),
                )
                .await?
            {
                decisions.push(decision);
                account = retry_broker_call(|| self.broker.get_account()).await?;
            }
        }

        // Step 5: scan the watchlist for new opportunities, budget-limited.
        let mut evaluated = 0u32;
        for symbol in &self.watchlist {
            if evaluated >= self.new_opportunity_budget {
                info!(budget = self.new_opportunity_budget, "new-opportunity budget exhausted");
                break;
            }
            if held_at_start.iter().any(|s| s == symbol) {
                continue;
            }
            if account.buying_power <= Decimal::ZERO {
                break;
            }
            evaluated += 1;
            if let Some(decision) = self
                .evaluate_symbol(
                    symbol,
                    QueryType::NewOpportunity,
                    trigger,
                    &account,
                    market_state,
                    overnight_summary.clone(),
                )
                .await?
            {
                decisions.push(decision);
                account = retry_broker_call(|| self.broker.get_account()).await?;
            }
        }

        Ok(CycleSummary {
            decisions,
            overnight_sells_handled: overnight_sells_handled.into_iter().collect(),
        })
    }

    /// Shares to propose for a Buy, capped at `max_position_size_pct` of
    /// equity; for a Sell, the full held quantity (partial exits are not
    /// modeled — spec §4.J names no partial-sell sizing rule).
    fn size_order(&self, action: Action, account: &AccountState, position: Option<&Position>, price: Decimal) -> u64 {
        match action {
            Action::Buy => {
                if price <= Decimal::ZERO {
                    return 0;
                }
                let cap = account.equity * Decimal::from(self.max_position_size_pct) / Decimal::from(100);
                (cap / price).floor().to_u64().unwrap_or(0)
            }
            Action::Sell => position
                .map(|p| p.qty.abs().floor().to_u64().unwrap_or(0))
                .unwrap_or(0),
            Action::Hold => 0,
        }
    }

    async fn execute_overnight_sell(
        &self,
        position: &Position,
        analysis: &core_models::OvernightAnalysis,
        account: &AccountState,
        market_state: MarketState,
        trigger: Trigger,
    ) -> Result<Decision, CoreError> {
        let price = position.current_price;
        let shares = self.size_order(Action::Sell, account, Some(position), price);
        let notional = price * Decimal::from(shares);

        let proposed = ProposedTrade {
            symbol: &position.symbol,
            action: Action::Sell,
            confidence: analysis.final_recommendation.confidence,
            notional,
        };
        let drawdown = self.daily_drawdown_pct(account.equity).await?;
        let risk_result = self.risk_gate.evaluate(
            &proposed,
            account,
            market_state,
            self.trades_executed_today(),
            drawdown,
        );

        let decision = Decision::new(
            position.symbol.clone(),
            Action::Sell,
            shares,
            price,
            analysis.final_recommendation.confidence,
            Sentiment::Bearish,
            format!(
                "overnight hand-off: {}",
                analysis.final_recommendation.reasoning
            ),
            Vec::new(),
            std::collections::BTreeMap::new(),
            String::new(),
            trigger,
            QueryType::PositionReview,
        )?;

        self.finish_decision(decision, risk_result, shares).await
    }

    async fn evaluate_symbol(
        &self,
        symbol: &str,
        query_type: QueryType,
        trigger: Trigger,
        account: &AccountState,
        market_state: MarketState,
        overnight_summary: Option<OvernightSummary>,
    ) -> Result<Option<Decision>, CoreError> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(90);
        let bars =
            retry_broker_call(|| self.broker.get_bars(symbol, start, end, "1Day")).await?;
        let indicators = core_indicators::compute_indicators(symbol, &bars)
            .unwrap_or_else(|_| core_models::IndicatorSet::insufficient_data(symbol));

        let position = account.position_for(symbol).cloned();
        let bundle = DataBundle {
            primary_indicators: Some(indicators.clone()),
            primary_position: position.clone(),
            portfolio_positions: account.positions.clone(),
            news: Vec::new(),
            market_regime_label: None,
            comparative: Vec::new(),
            overnight_summary: overnight_summary.clone(),
        };

        let ctx = QueryContext {
            query_type,
            trigger,
            profile: self.profile,
            primary_symbol: Some(symbol.to_string()),
            comparison_symbols: Vec::new(),
            portfolio_state: Some(account.clone()),
            overnight_context: overnight_summary,
            expected_format: ExpectedFormat::StandardDecision,
            include_news: false,
            include_market_regime: false,
            detail_level: DetailLevel::Standard,
        };

        let prompt = PromptAssembler::assemble(&ctx, &bundle);

        let started = std::time::Instant::now();
        let raw = match self.model.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%symbol, error = %e, "model unavailable, entering safe mode");
                self.alert_sink
                    .alert(Alert {
                        severity: AlertSeverity::Warning,
                        message: format!("model unavailable for {symbol}: {e}"),
                    })
                    .await
                    .ok();
                return Ok(Some(self.record_safe_mode_hold(symbol, trigger, query_type).await?));
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        self.store
            .record_llm_interaction(&LlmInteraction {
                timestamp: Utc::now(),
                symbol: Some(symbol.to_string()),
                model: self.model.name().to_string(),
                raw_prompt: prompt,
                raw_response: raw.clone(),
                parsed_classification: None,
                latency_ms,
            })
            .await?;

        let outcome = match ResponseParser::parse(&raw, &ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%symbol, error = %e, "response parse failed, skipping symbol this cycle");
                return Ok(None);
            }
        };

        let ParsedResult::Decision(model_decision) = outcome.result else {
            warn!(%symbol, ?query_type, "model returned a non-decision shape for a single-symbol query, skipping");
            return Ok(None);
        };

        let price = indicators
            .close
            .or_else(|| position.as_ref().map(|p| p.current_price))
            .unwrap_or(Decimal::ZERO);
        let shares = self.size_order(model_decision.action, account, position.as_ref(), price);
        let notional = price * Decimal::from(shares);

        let proposed = ProposedTrade {
            symbol,
            action: model_decision.action,
            confidence: model_decision.confidence,
            notional,
        };
        let drawdown = self.daily_drawdown_pct(account.equity).await?;
        let risk_result = self.risk_gate.evaluate(
            &proposed,
            account,
            market_state,
            self.trades_executed_today(),
            drawdown,
        );

        let decision = Decision::new(
            symbol.to_string(),
            model_decision.action,
            shares,
            price,
            model_decision.confidence,
            model_decision.sentiment,
            model_decision.reasoning,
            model_decision.risk_factors,
            outcome.quality_scores,
            raw,
            trigger,
            query_type,
        )?;

        Ok(Some(self.finish_decision(decision, risk_result, shares).await?))
    }

    async fn record_safe_mode_hold(
        &self,
        symbol: &str,
        trigger: Trigger,
        query_type: QueryType,
    ) -> Result<Decision, CoreError> {
        let decision = Decision::new(
            symbol.to_string(),
            Action::Hold,
            0,
            Decimal::ZERO,
            0,
            Sentiment::Neutral,
            "safe_mode: model collaborator unavailable".to_string(),
            Vec::new(),
            std::collections::BTreeMap::new(),
            String::new(),
            trigger,
            query_type,
        )?;
        self.store.record_decision(&decision).await?;
        Ok(decision)
    }

    /// Persists the Decision before any order is attempted (audit invariant:
    /// no order without a prior durable Decision record), then submits it if
    /// RiskGate approved and the action isn't Hold, and records the final
    /// execution outcome.
    async fn finish_decision(
        &self,
        mut decision: Decision,
        risk_result: core_models::RiskResult,
        shares: u64,
    ) -> Result<Decision, CoreError> {
        self.store.record_decision(&decision).await?;

        if !risk_result.approved {
            info!(symbol = %decision.symbol, reason = %risk_result.reason, "risk gate rejected trade");
            return Ok(decision);
        }
        for warning in &risk_result.warnings {
            warn!(symbol = %decision.symbol, %warning, "risk gate approved with warning");
        }
        if decision.action == Action::Hold || shares == 0 {
            return Ok(decision);
        }
        if self.dry_run {
            info!(symbol = %decision.symbol, "dry run: order recorded but not submitted");
            return Ok(decision);
        }

        let side = match decision.action {
            Action::Buy => OrderSide::Buy,
            Action::Sell => OrderSide::Sell,
            Action::Hold => unreachable!("Hold filtered above"),
        };

        let outcome = match tokio::time::timeout(
            self.fill_timeout,
            retry_broker_call(|| self.broker.place_market_order(&decision.symbol, shares, side)),
        )
        .await
        {
            Ok(Ok(order)) => ExecutionOutcome::Filled {
                order_id: order.order_id,
                fill_price: order.fill_price.unwrap_or(decision.price_snapshot),
            },
            Ok(Err(e)) => ExecutionOutcome::BrokerError {
                message: e.to_string(),
            },
            Err(_) => ExecutionOutcome::FillTimeout,
        };

        let executed = matches!(outcome, ExecutionOutcome::Filled { .. });
        self.store
            .update_decision_outcome(&decision.symbol, decision.timestamp, executed, &outcome)
            .await?;
        decision.executed = executed;
        decision.execution_outcome = outcome;
        self.trades_executed_today.fetch_add(1, Ordering::SeqCst);

        Ok(decision)
    }
}
