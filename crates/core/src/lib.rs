//! Decision Core library: wires the four subordinate crates (core-models,
//! core-store, core-indicators, core-prompting) and the Scheduler
//! (core-scheduler) into the running system described by spec §4 —
//! MarketClock driving a Scheduler that dispatches TradingAgent cycles and
//! the off-hours OvernightPipeline tasks. The `trading-agent` binary
//! (`src/main.rs`) is a thin CLI shell around the constructor this crate
//! exposes.

pub mod config;
pub mod error;
pub mod task_handlers;
pub mod trading_agent;

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use core_models::{Config, MarketState};
use core_prompting::{AlertSink, Broker, LoggingAlertSink, Model, NewsProvider, RiskGate};
use core_scheduler::{Cadence, MarketClock, NewsPipeline, OvernightPipeline, ScheduledTask, Scheduler};
use core_store::Store;

use error::CoreError;
use task_handlers::{
    BrokerPreflightTask, DailySummary, DeepSectorAnalysis, EarningsAnalysisTask,
    EveningDeepLearningTask, HandlerContext, NewsAccumulate, NewsSynthesize, OvernightSummaryTask,
    PreCloseAssessment, PremarketScannerTask, QuickMarketIntelligence, TradingAgentCycle,
    WeeklySelfCritiqueTask,
};
use trading_agent::TradingAgent;

/// Everything built at startup and handed to `Scheduler::run`.
pub struct System {
    pub scheduler: Scheduler,
    pub store: Arc<Store>,
}

/// Assembles the full system from `config`, the Broker/Model/NewsProvider
/// collaborators (AlertSink defaults to `LoggingAlertSink` unless a caller
/// supplies one), and an already-open `Store`. Registers every task in the
/// spec §4.I task table.
pub fn build_system(
    config: &Config,
    broker: Arc<dyn Broker>,
    model: Arc<dyn Model>,
    news_provider: Arc<dyn NewsProvider>,
    alert_sink: Option<Arc<dyn AlertSink>>,
    store: Arc<Store>,
) -> Result<System, CoreError> {
    let alert_sink = alert_sink.unwrap_or_else(|| Arc::new(LoggingAlertSink) as Arc<dyn AlertSink>);

    let timezone: Tz = config.market.timezone.parse().map_err(|_| {
        CoreError::Config(format!("invalid market timezone {}", config.market.timezone))
    })?;
    let clock = MarketClock::new(timezone, Some(Arc::clone(&broker)));

    let risk_gate = RiskGate::new(config.risk.clone(), config.trading.profile);
    let trading_agent = Arc::new(TradingAgent::new(
        Arc::clone(&broker),
        Arc::clone(&model),
        Arc::clone(&alert_sink),
        Arc::clone(&store),
        risk_gate,
        config.trading.profile,
        config.risk.max_position_size_pct,
        config.trading.new_opportunity_budget,
        config.trading.symbols.clone(),
        Duration::from_secs(config.trading.fill_timeout_seconds),
        config.trading.dry_run,
    ));

    let news_pipeline = Arc::new(NewsPipeline::new(Arc::clone(&news_provider), Arc::clone(&model)));
    let overnight_pipeline = Arc::new(OvernightPipeline::new(Arc::clone(&model)));

    let handler_ctx = Arc::new(HandlerContext {
        broker,
        model,
        news_provider,
        alert_sink,
        store: Arc::clone(&store),
        trading_agent,
        news_pipeline,
        overnight_pipeline,
        watchlist: config.trading.symbols.clone(),
        universe_size: config.universe.size,
    });

    let cycle_interval = Duration::from_secs(u64::from(config.trading.cycle_interval_minutes) * 60);

    let tasks = vec![
        ScheduledTask::new(
            "trading_agent.run_cycle",
            MarketState::ActiveTrading,
            Cadence::Every(cycle_interval),
            false,
        ),
        ScheduledTask::new(
            "quick_market_intelligence",
            MarketState::ActiveTrading,
            Cadence::Every(Duration::from_secs(30 * 60)),
            true,
        ),
        ScheduledTask::new(
            "deep_sector_analysis",
            MarketState::ActiveTrading,
            Cadence::Every(Duration::from_secs(2 * 60 * 60)),
            true,
        ),
        ScheduledTask::new(
            "pre_close_assessment",
            MarketState::MarketClosing,
            Cadence::DailyAt { hour: 15, minute: 0 },
            true,
        ),
        ScheduledTask::new(
            "daily_summary",
            MarketState::MarketClosing,
            Cadence::DailyAt { hour: 16, minute: 0 },
            false,
        ),
        ScheduledTask::new(
            "news_timeline.start_accumulation",
            MarketState::EveningAnalysis,
            Cadence::DailyAt { hour: 16, minute: 30 },
            true,
        ),
        ScheduledTask::new(
            "evening_deep_learning",
            MarketState::EveningAnalysis,
            Cadence::DailyAt { hour: 16, minute: 30 },
            true,
        ),
        ScheduledTask::new(
            "earnings_analysis",
            MarketState::EveningAnalysis,
            Cadence::DailyAt { hour: 17, minute: 0 },
            true,
        ),
        ScheduledTask::new(
            "weekly_self_critique",
            MarketState::EveningAnalysis,
            Cadence::WeeklyAt {
                weekday: chrono::Weekday::Fri,
                hour: 18,
                minute: 0,
            },
            true,
        ),
        ScheduledTask::new(
            "news_timeline.accumulate",
            MarketState::OvernightSleep,
            Cadence::Every(Duration::from_secs(30 * 60)),
            true,
        ),
        ScheduledTask::new(
            "news_timeline.synthesize",
            MarketState::OvernightSleep,
            Cadence::DailyAt { hour: 2, minute: 0 },
            true,
        ),
        ScheduledTask::new(
            "overnight_summary",
            MarketState::PremarketPrep,
            Cadence::DailyAt { hour: 6, minute: 0 },
            false,
        ),
        ScheduledTask::new(
            "premarket_scanner",
            MarketState::PremarketPrep,
            Cadence::DailyAt { hour: 7, minute: 0 },
            true,
        ),
        ScheduledTask::new(
            "broker_preflight",
            MarketState::PremarketPrep,
            Cadence::DailyAt { hour: 9, minute: 0 },
            false,
        ),
    ];

    let mut scheduler = Scheduler::new(clock, tasks);
    scheduler.register("trading_agent.run_cycle", Arc::new(TradingAgentCycle(Arc::clone(&handler_ctx))));
    scheduler.register("quick_market_intelligence", Arc::new(QuickMarketIntelligence(Arc::clone(&handler_ctx))));
    scheduler.register("deep_sector_analysis", Arc::new(DeepSectorAnalysis(Arc::clone(&handler_ctx))));
    scheduler.register("pre_close_assessment", Arc::new(PreCloseAssessment(Arc::clone(&handler_ctx))));
    scheduler.register("daily_summary", Arc::new(DailySummary(Arc::clone(&handler_ctx))));
    scheduler.register(
        "news_timeline.start_accumulation",
        Arc::new(NewsAccumulate(Arc::clone(&handler_ctx))),
    );
    scheduler.register("evening_deep_learning", Arc::new(EveningDeepLearningTask(Arc::clone(&handler_ctx))));
    scheduler.register("earnings_analysis", Arc::new(EarningsAnalysisTask(Arc::clone(&handler_ctx))));
    scheduler.register("weekly_self_critique", Arc::new(WeeklySelfCritiqueTask(Arc::clone(&handler_ctx))));
    scheduler.register("news_timeline.accumulate", Arc::new(NewsAccumulate(Arc::clone(&handler_ctx))));
    scheduler.register("news_timeline.synthesize", Arc::new(NewsSynthesize(Arc::clone(&handler_ctx))));
    scheduler.register("overnight_summary", Arc::new(OvernightSummaryTask(Arc::clone(&handler_ctx))));
    scheduler.register("premarket_scanner", Arc::new(PremarketScannerTask(Arc::clone(&handler_ctx))));
    scheduler.register("broker_preflight", Arc::new(BrokerPreflightTask(handler_ctx)));

    Ok(System { scheduler, store })
}
