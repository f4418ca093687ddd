//! Wires `TradingAgent`, `NewsPipeline`, `OvernightPipeline`, and
//! `UniverseManager` into `core_scheduler::TaskHandler` implementations, one
//! per row of the authoritative task table (spec §4.I). Registered on a
//! `Scheduler` by `crate::build_scheduler`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use core_models::{
    DetailLevel, ExpectedFormat, MarketState, QueryContext, QueryType, Trigger,
};
use core_prompting::{Alert, AlertSeverity, AlertSink, Broker, DataBundle, Model, NewsProvider, PromptAssembler};
use core_scheduler::{NewsPipeline, OvernightPipeline, SchedulerError, TaskHandler};
use core_store::{DailyPerformance, EarningsAnalysisEntry, PremarketScannerEntry, Store};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::trading_agent::TradingAgent;

/// Shared collaborators every task handler needs; constructed once at
/// startup and cloned (cheaply, via `Arc`) into each handler.
pub struct HandlerContext {
    pub broker: Arc<dyn Broker>,
    pub model: Arc<dyn Model>,
    pub news_provider: Arc<dyn NewsProvider>,
    pub alert_sink: Arc<dyn AlertSink>,
    pub store: Arc<Store>,
    pub trading_agent: Arc<TradingAgent>,
    pub news_pipeline: Arc<NewsPipeline>,
    pub overnight_pipeline: Arc<OvernightPipeline>,
    pub watchlist: Vec<String>,
    pub universe_size: u32,
}

impl HandlerContext {
    fn universe_manager(&self) -> core_scheduler::UniverseManager<'_> {
        core_scheduler::UniverseManager::new(&self.store, self.universe_size)
    }

    /// The current universe symbol set: the 24h cache if fresh, otherwise a
    /// freshly built one (holdings come from the Broker, since this is an
    /// off-cycle read and TradingAgent doesn't expose its cached account).
    async fn universe_symbols(&self) -> Result<Vec<String>, SchedulerError> {
        if let Some(cached) = self.universe_manager().cached(24)? {
            return Ok(cached.into_iter().map(|e| e.symbol).collect());
        }
        let account = self
            .broker
            .get_account()
            .await
            .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;
        let holdings: Vec<String> = account.positions.iter().map(|p| p.symbol.clone()).collect();
        let built = self
            .universe_manager()
            .build(&holdings, &self.watchlist, &[])?;
        Ok(built.into_iter().map(|e| e.symbol).collect())
    }
}

/// `ACTIVE_TRADING | TradingAgent.run_cycle | every 5 min`.
pub struct TradingAgentCycle(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for TradingAgentCycle {
    async fn run(&self) -> Result<(), SchedulerError> {
        let summary = self
            .0
            .trading_agent
            .run_cycle(MarketState::ActiveTrading)
            .await
            .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;
        info!(
            decisions = summary.decisions.len(),
            overnight_sells = summary.overnight_sells_handled.len(),
            "trading cycle complete"
        );
        Ok(())
    }
}

/// Renders a one-shot, non-trading analysis query: the observational tasks
/// (QuickMarketIntelligence, DeepSectorAnalysis, PreCloseAssessment) share
/// this shape — PromptAssembler → Model, result only logged, never parsed
/// into a Decision, since none of them name an action the RiskGate/Broker
/// would execute.
async fn run_observational_query(
    ctx: &HandlerContext,
    query_type: QueryType,
    label: &str,
) -> Result<(), SchedulerError> {
    let account = ctx
        .broker
        .get_account()
        .await
        .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;

    let query_ctx = QueryContext {
        query_type,
        trigger: Trigger::ScheduledCycle,
        profile: core_models::TradingProfile::Moderate,
        primary_symbol: None,
        comparison_symbols: Vec::new(),
        portfolio_state: Some(account.clone()),
        overnight_context: None,
        expected_format: ExpectedFormat::StandardDecision,
        include_news: false,
        include_market_regime: true,
        detail_level: DetailLevel::Minimal,
    };
    let bundle = DataBundle {
        portfolio_positions: account.positions,
        ..Default::default()
    };
    let prompt = PromptAssembler::assemble(&query_ctx, &bundle);
    let raw = ctx
        .model
        .complete(&prompt)
        .await
        .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;
    info!(task = label, response_len = raw.len(), "observational query complete");
    Ok(())
}

/// `ACTIVE_TRADING | QuickMarketIntelligence | every 30 min`.
pub struct QuickMarketIntelligence(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for QuickMarketIntelligence {
    async fn run(&self) -> Result<(), SchedulerError> {
        run_observational_query(&self.0, QueryType::MarketRegime, "quick_market_intelligence").await
    }
}

/// `ACTIVE_TRADING | DeepSectorAnalysis | every 2 h`.
pub struct DeepSectorAnalysis(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for DeepSectorAnalysis {
    async fn run(&self) -> Result<(), SchedulerError> {
        run_observational_query(&self.0, QueryType::SectorRotation, "deep_sector_analysis").await
    }
}

/// `MARKET_CLOSING | PreCloseAssessment | 15:00 once`.
pub struct PreCloseAssessment(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for PreCloseAssessment {
    async fn run(&self) -> Result<(), SchedulerError> {
        run_observational_query(&self.0, QueryType::PortfolioAudit, "pre_close_assessment").await
    }
}

/// `MARKET_CLOSING | DailySummary | 16:00 once`: rolls equity/P&L into
/// `daily_performance` and resets TradingAgent's trade-frequency counter for
/// the next day's RiskGate checks.
pub struct DailySummary(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for DailySummary {
    async fn run(&self) -> Result<(), SchedulerError> {
        let account = self
            .0
            .broker
            .get_account()
            .await
            .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;
        let today = Utc::now().date_naive();
        let decisions = self
            .0
            .store
            .list_decisions_since(Utc::now() - chrono::Duration::hours(24))
            .await?;
        let trades = decisions.iter().filter(|d| d.executed).count() as u32;
        let wins = decisions
            .iter()
            .filter(|d| d.executed && matches!(d.action, core_models::Action::Sell))
            .count();
        let win_rate = if trades == 0 { 0.0 } else { wins as f64 / trades as f64 };

        self.0
            .store
            .record_daily_performance(&DailyPerformance {
                date: today,
                pnl: account.equity - account.cash,
                win_rate,
                trades,
                regime_label: "unclassified".to_string(),
            })
            .await?;
        self.0.trading_agent.reset_daily_counters();
        info!(%today, trades, "daily summary recorded");
        Ok(())
    }
}

/// `EVENING_ANALYSIS | NewsTimeline.start_accumulation | 16:30 once` and
/// `OVERNIGHT_SLEEP | NewsTimeline.accumulate | every 30 min` share a body:
/// both simply run the accumulation phase against the current universe.
pub struct NewsAccumulate(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for NewsAccumulate {
    async fn run(&self) -> Result<(), SchedulerError> {
        let symbols = self.0.universe_symbols().await?;
        let today = Utc::now().date_naive();
        let since = Utc::now() - chrono::Duration::minutes(30);
        let new_count = self
            .0
            .news_pipeline
            .accumulate(&self.0.store, &symbols, today, since)
            .await?;
        info!(new_count, "news accumulation tick complete");
        Ok(())
    }
}

/// `OVERNIGHT_SLEEP | NewsTimeline.synthesize | 02:00 once`.
pub struct NewsSynthesize(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for NewsSynthesize {
    async fn run(&self) -> Result<(), SchedulerError> {
        let symbols = self.0.universe_symbols().await?;
        let today = Utc::now().date_naive();
        let synthesized = self.0.news_pipeline.synthesize(&self.0.store, &symbols, today).await?;
        info!(synthesized, "news synthesis complete");
        Ok(())
    }
}

/// `EVENING_ANALYSIS | EveningDeepLearning (iterative) | 16:30 once`: runs
/// the iterative analyst loop for every universe symbol.
pub struct EveningDeepLearningTask(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for EveningDeepLearningTask {
    async fn run(&self) -> Result<(), SchedulerError> {
        let symbols = self.0.universe_symbols().await?;
        let today = Utc::now().date_naive();
        for symbol in symbols {
            let account = self
                .0
                .broker
                .get_account()
                .await
                .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;
            let ctx = QueryContext {
                query_type: QueryType::RiskAssessment,
                trigger: Trigger::ScheduledCycle,
                profile: core_models::TradingProfile::Moderate,
                primary_symbol: Some(symbol.clone()),
                comparison_symbols: Vec::new(),
                portfolio_state: Some(account.clone()),
                overnight_context: None,
                expected_format: ExpectedFormat::StandardDecision,
                include_news: true,
                include_market_regime: false,
                detail_level: DetailLevel::Detailed,
            };
            let end = Utc::now();
            let start = end - chrono::Duration::days(90);
            let bars = self
                .0
                .broker
                .get_bars(&symbol, start, end, "1Day")
                .await
                .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;
            let indicators = core_indicators::compute_indicators(&symbol, &bars)
                .unwrap_or_else(|_| core_models::IndicatorSet::insufficient_data(&symbol));
            let bundle = DataBundle {
                primary_indicators: Some(indicators),
                primary_position: account.position_for(&symbol).cloned(),
                portfolio_positions: account.positions,
                ..Default::default()
            };

            let fetch_data =
                |sym: &str, name: &str| format!("{name} unavailable for {sym} in this build");

            match self
                .0
                .overnight_pipeline
                .evening_deep_learning(&self.0.store, &symbol, today, &ctx, bundle, fetch_data)
                .await
            {
                Ok(analysis) => info!(%symbol, iterations = analysis.iterations, "evening deep learning complete"),
                Err(e) => warn!(%symbol, error = %e, "evening deep learning failed"),
            }
        }
        Ok(())
    }
}

/// `EVENING_ANALYSIS | EarningsAnalysis | 17:00 once`: a no-op absent an
/// earnings-calendar collaborator (spec Open Question (a)) — still records
/// an entry so the artifact stream reflects that the task ran.
pub struct EarningsAnalysisTask(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for EarningsAnalysisTask {
    async fn run(&self) -> Result<(), SchedulerError> {
        self.0.store.append_earnings_analysis(&EarningsAnalysisEntry {
            generated_at: Utc::now(),
            symbol: String::new(),
            notes: "no earnings-calendar collaborator configured, task is a no-op".to_string(),
        })?;
        Ok(())
    }
}

/// `EVENING_ANALYSIS | WeeklySelfCritique | Friday 18:00`.
pub struct WeeklySelfCritiqueTask(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for WeeklySelfCritiqueTask {
    async fn run(&self) -> Result<(), SchedulerError> {
        if let Some(entry) = self
            .0
            .overnight_pipeline
            .weekly_self_critique(&self.0.store, Utc::now())
            .await?
        {
            info!(week_ending = %entry.week_ending, "weekly self-critique recorded");
        }
        Ok(())
    }
}

/// `PREMARKET_PREP | OvernightSummary | 06:00 once`: runs the validation
/// phase (breaking news since synthesis) then aggregates the hand-off.
pub struct OvernightSummaryTask(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for OvernightSummaryTask {
    async fn run(&self) -> Result<(), SchedulerError> {
        let symbols = self.0.universe_symbols().await?;
        let today = Utc::now().date_naive();
        self.0.news_pipeline.validate(&self.0.store, &symbols, today).await?;

        let gap_candidates = self.0.scan_gaps(&symbols).await.unwrap_or_default();
        let summary = self.0.overnight_pipeline.morning_handoff(
            &self.0.store,
            &symbols,
            today,
            gap_candidates,
        )?;
        info!(
            recommendations = summary.synthesis_recommendations.len(),
            "overnight summary produced"
        );
        Ok(())
    }
}

impl HandlerContext {
    /// A symbol gaps if its latest price differs from its most recent daily
    /// close by more than 2% — used by both `OvernightSummaryTask` and
    /// `PremarketScannerTask`.
    async fn scan_gaps(&self, symbols: &[String]) -> Result<Vec<String>, SchedulerError> {
        let mut gaps = Vec::new();
        let threshold = Decimal::new(2, 2);
        for symbol in symbols {
            let Ok(price) = self.broker.get_latest_price(symbol).await else {
                continue;
            };
            let end = Utc::now();
            let start = end - chrono::Duration::days(5);
            let Ok(bars) = self.broker.get_bars(symbol, start, end, "1Day").await else {
                continue;
            };
            let Some(prior_close) = bars.iter().rev().nth(1).map(|b| b.close) else {
                continue;
            };
            if prior_close.is_zero() {
                continue;
            }
            let gap = ((price - prior_close) / prior_close).abs();
            if gap >= threshold {
                gaps.push(symbol.clone());
            }
        }
        Ok(gaps)
    }
}

/// `PREMARKET_PREP | PremarketScanner | 07:00 once`.
pub struct PremarketScannerTask(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for PremarketScannerTask {
    async fn run(&self) -> Result<(), SchedulerError> {
        let symbols = self.0.universe_symbols().await?;
        let gap_candidates = self.0.scan_gaps(&symbols).await?;
        self.0.store.append_premarket_scanner(&PremarketScannerEntry {
            generated_at: Utc::now(),
            gap_candidates: gap_candidates.clone(),
            notes: format!("{} symbols scanned, {} gap candidates", symbols.len(), gap_candidates.len()),
        })?;
        info!(gaps = gap_candidates.len(), "premarket scan complete");
        Ok(())
    }
}

/// `PREMARKET_PREP | Broker/market-open preflight | 09:00 once`: confirms
/// the Broker still reports paper mode and is reachable before the day's
/// first `TradingAgent.run_cycle`, alerting rather than halting on failure
/// (the fatal non-paper check already ran once at process startup).
pub struct BrokerPreflightTask(pub Arc<HandlerContext>);

#[async_trait]
impl TaskHandler for BrokerPreflightTask {
    async fn run(&self) -> Result<(), SchedulerError> {
        match self.0.broker.is_paper_account().await {
            Ok(true) => {
                info!("broker preflight ok, paper mode confirmed");
                Ok(())
            }
            Ok(false) => {
                self.0
                    .alert_sink
                    .alert(Alert {
                        severity: AlertSeverity::Critical,
                        message: "broker no longer reports paper mode".to_string(),
                    })
                    .await
                    .ok();
                Err(SchedulerError::BrokerProbe(
                    "broker preflight: non-paper account".to_string(),
                ))
            }
            Err(e) => {
                self.0
                    .alert_sink
                    .alert(Alert {
                        severity: AlertSeverity::Warning,
                        message: format!("broker preflight unreachable: {e}"),
                    })
                    .await
                    .ok();
                Err(SchedulerError::BrokerProbe(e.to_string()))
            }
        }
    }
}
