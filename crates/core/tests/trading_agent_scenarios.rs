//! End-to-end `TradingAgent` scenarios, grounded directly on spec §8's
//! worked examples: a full cycle wired against `FakeBroker`/`ScenarioModel`
//! collaborators (no real network/process boundary), asserting the Decision
//! each scenario produces and whether RiskGate let it reach the Broker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use core_models::{
    Action, AccountState, AnalysisDepth, Bar, ExecutionOutcome, FinalRecommendation,
    MarketState, OvernightAnalysis, Position, RiskConfig, TradingProfile,
};
use core_prompting::test_support::{FakeBroker, RecordingAlertSink, ScenarioModel};
use core_prompting::{AlertSeverity, Model, PromptingError, RiskGate};
use core_store::Store;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trading_core::trading_agent::TradingAgent;

fn bars(symbol: &str, n: usize, start: f64, step: f64) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let price = start + i as f64 * step;
            Bar {
                symbol: symbol.to_string(),
                timeframe: "1Day".to_string(),
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap(),
                open: Decimal::from_f64_retain(price).unwrap(),
                high: Decimal::from_f64_retain(price + 1.0).unwrap(),
                low: Decimal::from_f64_retain(price - 1.0).unwrap(),
                close: Decimal::from_f64_retain(price + 0.2).unwrap(),
                volume: 1_000_000 + i as u64 * 100,
            }
        })
        .collect()
}

fn position(symbol: &str, qty: Decimal, current_price: Decimal, market_value: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        qty,
        avg_entry_price: current_price,
        current_price,
        market_value,
        unrealized_pnl_abs: Decimal::ZERO,
        unrealized_pnl_pct: Decimal::ZERO,
        days_held: 5,
    }
}

fn account(equity: Decimal, buying_power: Decimal, positions: Vec<Position>) -> AccountState {
    AccountState {
        equity,
        cash: buying_power,
        buying_power,
        daytime_trades_used: 0,
        positions,
        timestamp: Utc::now(),
    }
}

async fn store() -> Arc<Store> {
    let dir = tempfile::tempdir().unwrap();
    Arc::new(Store::open_in_memory(dir.into_path()).unwrap())
}

#[allow(clippy::too_many_arguments)]
fn agent(
    broker: FakeBroker,
    model: Arc<dyn Model>,
    store: Arc<Store>,
    profile: TradingProfile,
    watchlist: Vec<&str>,
) -> TradingAgent {
    TradingAgent::new(
        Arc::new(broker),
        model,
        Arc::new(RecordingAlertSink::new()),
        store,
        RiskGate::new(RiskConfig::default(), profile),
        profile,
        RiskConfig::default().max_position_size_pct,
        10,
        watchlist.into_iter().map(String::from).collect(),
        Duration::from_secs(5),
        false,
    )
}

/// Spec §8: a bullish technical read on an unheld watchlist symbol produces
/// an executed Buy under `NEW_OPPORTUNITY`.
#[tokio::test]
async fn new_opportunity_bullish_buy_executes() {
    let broker = FakeBroker::new(account(dec!(100_000), dec!(100_000), vec![]), true)
        .with_bars("NVDA", bars("NVDA", 60, 100.0, 0.8));
    let model: Arc<dyn Model> = Arc::new(ScenarioModel::new("fake-llama"));
    let agent = agent(broker, model, store().await, TradingProfile::Moderate, vec!["NVDA"]);

    let summary = agent.run_cycle(MarketState::ActiveTrading).await.unwrap();

    assert_eq!(summary.decisions.len(), 1);
    let decision = &summary.decisions[0];
    assert_eq!(decision.symbol, "NVDA");
    assert_eq!(decision.action, Action::Buy);
    assert!(decision.shares > 0);
    assert!(decision.executed);
    assert!(matches!(decision.execution_outcome, ExecutionOutcome::Filled { .. }));
}

/// Spec §8: a flat/neutral read on an already-held symbol under a Rotator
/// profile and a capital-constrained account produces a Hold, never an order.
#[tokio::test]
async fn position_review_hold_under_capital_constraint() {
    let held = position("AAPL", dec!(100), dec!(150), dec!(15_000));
    let broker = FakeBroker::new(account(dec!(100_000), dec!(4_000), vec![held]), true)
        .with_bars("AAPL", bars("AAPL", 60, 100.0, 0.0));
    let model: Arc<dyn Model> = Arc::new(ScenarioModel::new("fake-llama"));
    let agent = agent(broker, model, store().await, TradingProfile::Rotator, vec![]);

    let summary = agent.run_cycle(MarketState::ActiveTrading).await.unwrap();

    assert_eq!(summary.decisions.len(), 1);
    let decision = &summary.decisions[0];
    assert_eq!(decision.symbol, "AAPL");
    assert_eq!(decision.action, Action::Hold);
    assert_eq!(decision.trigger, core_models::Trigger::CapitalConstraint);
    assert!(!decision.executed);
}

/// Spec §8 / Open Question (c): portfolio exposure already over cap blocks a
/// new Buy but still lets a Sell through (with a warning), since selling can
/// only reduce exposure.
#[tokio::test]
async fn exposure_cap_blocks_buy_allows_sell() {
    let aapl = position("AAPL", dec!(1_000), dec!(145), dec!(145_000));
    let meta = position("META", dec!(100), dec!(100), dec!(10_000));
    let broker = FakeBroker::new(account(dec!(100_000), dec!(20_000), vec![aapl, meta]), true)
        .with_bars("AAPL", bars("AAPL", 60, 100.0, 0.0))
        .with_bars("META", bars("META", 60, 100.0, -0.5))
        .with_bars("MSFT", bars("MSFT", 60, 100.0, 0.5));
    let model: Arc<dyn Model> = Arc::new(ScenarioModel::new("fake-llama"));
    let agent = agent(broker, model, store().await, TradingProfile::Moderate, vec!["MSFT"]);

    let summary = agent.run_cycle(MarketState::ActiveTrading).await.unwrap();

    let aapl_decision = summary.decisions.iter().find(|d| d.symbol == "AAPL").unwrap();
    assert_eq!(aapl_decision.action, Action::Hold);

    let meta_decision = summary.decisions.iter().find(|d| d.symbol == "META").unwrap();
    assert_eq!(meta_decision.action, Action::Sell);
    assert!(meta_decision.executed, "sell should be approved despite exposure over cap");

    let msft_decision = summary.decisions.iter().find(|d| d.symbol == "MSFT").unwrap();
    assert_eq!(msft_decision.action, Action::Buy);
    assert!(!msft_decision.executed, "buy should be rejected: exposure already over cap");
    assert!(matches!(msft_decision.execution_outcome, ExecutionOutcome::NotAttempted));
}

struct AlwaysErrorModel;

#[async_trait]
impl Model for AlwaysErrorModel {
    fn name(&self) -> &str {
        "always-error"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, PromptingError> {
        Err(PromptingError::Model("connection refused".to_string()))
    }
}

/// Spec §7: when the Model collaborator is unavailable, every symbol still
/// gets a recorded zero-confidence Hold ("safe mode") instead of the cycle
/// aborting.
#[tokio::test]
async fn model_unavailable_enters_safe_mode_for_every_symbol() {
    let broker = FakeBroker::new(account(dec!(100_000), dec!(100_000), vec![]), true)
        .with_bars("AAPL", bars("AAPL", 60, 100.0, 0.5))
        .with_bars("MSFT", bars("MSFT", 60, 100.0, 0.5));
    let alert_sink = Arc::new(RecordingAlertSink::new());
    let agent = TradingAgent::new(
        Arc::new(broker),
        Arc::new(AlwaysErrorModel),
        Arc::clone(&alert_sink) as Arc<dyn core_prompting::AlertSink>,
        store().await,
        RiskGate::new(RiskConfig::default(), TradingProfile::Moderate),
        TradingProfile::Moderate,
        RiskConfig::default().max_position_size_pct,
        10,
        vec!["AAPL".to_string(), "MSFT".to_string()],
        Duration::from_secs(5),
        false,
    );

    let summary = agent.run_cycle(MarketState::ActiveTrading).await.unwrap();

    assert_eq!(summary.decisions.len(), 2);
    for decision in &summary.decisions {
        assert_eq!(decision.action, Action::Hold);
        assert_eq!(decision.confidence, 0);
        assert!(decision.reasoning.contains("safe_mode"));
    }
    let alerts = alert_sink.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Warning));
}

/// Spec §4.J step 3: a stored actionable overnight sell executes before any
/// other step, built directly from the overnight recommendation rather than
/// a fresh Model call.
#[tokio::test]
async fn overnight_handoff_sell_executes_first() {
    let held = position("MSFT", dec!(50), dec!(140), dec!(7_000));
    let broker = FakeBroker::new(account(dec!(100_000), dec!(50_000), vec![held]), true);
    let model: Arc<dyn Model> = Arc::new(ScenarioModel::new("fake-llama"));
    let store = store().await;

    let analysis = OvernightAnalysis {
        symbol: "MSFT".to_string(),
        timestamp: Utc::now() - chrono::Duration::hours(12),
        iterations: 3,
        conversation_history: vec![],
        final_recommendation: FinalRecommendation {
            action: Action::Sell,
            confidence: 80,
            entry_price: None,
            target_price: None,
            stop_loss: None,
            reasoning: "deteriorating guidance, exit before open".to_string(),
        },
        analysis_depth: AnalysisDepth::Deep,
    };
    store.write_overnight_analysis(Utc::now().date_naive(), &analysis).unwrap();

    let agent = agent(broker, model, Arc::clone(&store), TradingProfile::Moderate, vec![]);
    let summary = agent.run_cycle(MarketState::ActiveTrading).await.unwrap();

    assert_eq!(summary.overnight_sells_handled, vec!["MSFT".to_string()]);
    assert_eq!(summary.decisions.len(), 1);
    let decision = &summary.decisions[0];
    assert_eq!(decision.symbol, "MSFT");
    assert_eq!(decision.action, Action::Sell);
    assert_eq!(decision.confidence, 80);
    assert!(decision.reasoning.starts_with("overnight hand-off:"));
    assert!(decision.executed);
}

struct PlainProseModel;

#[async_trait]
impl Model for PlainProseModel {
    fn name(&self) -> &str {
        "plain-prose"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, PromptingError> {
        Ok("I'd rather not answer that.".to_string())
    }
}

/// Spec §4.D: a response with no extractable JSON object is a parse
/// failure, not an error — the symbol is skipped for this cycle and no
/// Decision is recorded for it at all.
#[tokio::test]
async fn unparseable_response_produces_no_decision() {
    let broker = FakeBroker::new(account(dec!(100_000), dec!(100_000), vec![]), true)
        .with_bars("ZZZZ", bars("ZZZZ", 60, 50.0, 0.2));
    let store = store().await;
    let agent = TradingAgent::new(
        Arc::new(broker),
        Arc::new(PlainProseModel),
        Arc::new(RecordingAlertSink::new()),
        Arc::clone(&store),
        RiskGate::new(RiskConfig::default(), TradingProfile::Moderate),
        TradingProfile::Moderate,
        RiskConfig::default().max_position_size_pct,
        10,
        vec!["ZZZZ".to_string()],
        Duration::from_secs(5),
        false,
    );

    let summary = agent.run_cycle(MarketState::ActiveTrading).await.unwrap();

    assert!(summary.decisions.is_empty());
    let recorded = store.list_decisions_since(Utc::now() - chrono::Duration::hours(1)).await.unwrap();
    assert!(recorded.is_empty(), "a parse failure must not persist a Decision");
}
