//! Concrete `PromptComponent` variants (spec §4.C data model). Each struct
//! is constructed fresh per assembly call with the slice of the data bundle
//! it renders already embedded — the trait itself only receives `ctx`, per
//! `core_models::PromptComponent`'s doc comment ("this crate owns rendering
//! logic and data access").

use core_models::{
    DetailLevel, IndicatorSet, NewsArticle, OvernightSummary, Position, PromptComponent,
    QueryContext, QueryType,
};

use crate::task_instructions::task_instruction_text;

const PRIORITY_QUERY_TYPE: i32 = 100;
const PRIORITY_TRIGGER: i32 = 95;
const PRIORITY_TRADING_PROFILE: i32 = 90;
const PRIORITY_POSITION_DATA: i32 = 80;
const PRIORITY_TECHNICAL_DATA: i32 = 75;
const PRIORITY_PORTFOLIO_SUMMARY: i32 = 70;
const PRIORITY_OVERNIGHT_CONTEXT: i32 = 65;
const PRIORITY_COMPARATIVE_DATA: i32 = 60;
const PRIORITY_MARKET_REGIME: i32 = 55;
const PRIORITY_NEWS: i32 = 50;
const PRIORITY_TASK_INSTRUCTION: i32 = 20;
const PRIORITY_RESPONSE_FORMAT: i32 = 10;

pub struct QueryTypeComponent;

impl PromptComponent for QueryTypeComponent {
    fn priority(&self) -> i32 {
        PRIORITY_QUERY_TYPE
    }
    fn is_relevant(&self, _ctx: &QueryContext) -> bool {
        true
    }
    fn render(&self, ctx: &QueryContext) -> String {
        format!("Query type: {:?}", ctx.query_type)
    }
    fn name(&self) -> &str {
        "query_type"
    }
}

pub struct TriggerComponent;

impl PromptComponent for TriggerComponent {
    fn priority(&self) -> i32 {
        PRIORITY_TRIGGER
    }
    fn is_relevant(&self, _ctx: &QueryContext) -> bool {
        true
    }
    fn render(&self, ctx: &QueryContext) -> String {
        format!("Trigger: {:?}", ctx.trigger)
    }
    fn name(&self) -> &str {
        "trigger"
    }
}

pub struct TradingProfileComponent;

impl PromptComponent for TradingProfileComponent {
    fn priority(&self) -> i32 {
        PRIORITY_TRADING_PROFILE
    }
    fn is_relevant(&self, _ctx: &QueryContext) -> bool {
        true
    }
    fn render(&self, ctx: &QueryContext) -> String {
        let t = ctx.profile.thresholds();
        format!(
            "Trading profile: {:?} (posture: {}, min buy confidence {}, min sell confidence {})",
            ctx.profile, t.posture, t.min_buy_confidence, t.min_sell_confidence
        )
    }
    fn name(&self) -> &str {
        "trading_profile"
    }
}

fn fmt_opt(value: Option<rust_decimal::Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "absent".to_string())
}

pub struct TechnicalDataComponent {
    pub indicators: IndicatorSet,
}

impl PromptComponent for TechnicalDataComponent {
    fn priority(&self) -> i32 {
        PRIORITY_TECHNICAL_DATA
    }
    fn is_relevant(&self, ctx: &QueryContext) -> bool {
        matches!(
            ctx.query_type,
            QueryType::NewOpportunity | QueryType::PositionReview | QueryType::TradePostmortem
        )
    }
    fn render(&self, ctx: &QueryContext) -> String {
        let ind = &self.indicators;
        match ctx.detail_level {
            DetailLevel::Minimal => format!(
                "Technical ({}): close={} trend={:?} momentum={:?}",
                ind.symbol, fmt_opt(ind.close), ind.signals.trend, ind.signals.momentum
            ),
            DetailLevel::Standard | DetailLevel::Detailed => format!(
                "Technical data for {}:\n  close={} sma_20={} sma_50={} ema_12={} ema_26={}\n  macd={} macd_signal={} macd_histogram={}\n  rsi_14={} (momentum={:?})\n  bollinger_upper={} bollinger_mid={} bollinger_lower={} (band_position={:?})\n  atr_14={} stdev={} historical_volatility={}\n  volume_ratio={} obv={}\n  support={} resistance={}\n  trend={:?} composite={:?}",
                ind.symbol,
                fmt_opt(ind.close), fmt_opt(ind.sma_20), fmt_opt(ind.sma_50), fmt_opt(ind.ema_12), fmt_opt(ind.ema_26),
                fmt_opt(ind.macd), fmt_opt(ind.macd_signal), fmt_opt(ind.macd_histogram),
                fmt_opt(ind.rsi_14), ind.signals.momentum,
                fmt_opt(ind.bollinger_upper), fmt_opt(ind.bollinger_mid), fmt_opt(ind.bollinger_lower), ind.signals.band_position,
                fmt_opt(ind.atr_14), fmt_opt(ind.stdev), fmt_opt(ind.historical_volatility),
                fmt_opt(ind.volume_ratio), fmt_opt(ind.obv),
                fmt_opt(ind.support), fmt_opt(ind.resistance),
                ind.signals.trend, ind.signals.composite,
            ),
        }
    }
    fn name(&self) -> &str {
        "technical_data"
    }
}

/// Prepends "YOU ALREADY OWN ..." to suppress the BUY-bias failure mode
/// (spec §4.C).
pub struct PositionDataComponent {
    pub position: Position,
}

impl PromptComponent for PositionDataComponent {
    fn priority(&self) -> i32 {
        PRIORITY_POSITION_DATA
    }
    fn is_relevant(&self, ctx: &QueryContext) -> bool {
        matches!(
            ctx.query_type,
            QueryType::PositionReview | QueryType::TradePostmortem
        )
    }
    fn render(&self, _ctx: &QueryContext) -> String {
        let p = &self.position;
        format!(
            "YOU ALREADY OWN {} shares of {} at avg entry {}, current price {}, unrealized P&L {}%",
            p.qty, p.symbol, p.avg_entry_price, p.current_price, p.unrealized_pnl_pct
        )
    }
    fn name(&self) -> &str {
        "position_data"
    }
}

/// One-line-per-symbol compact table, per spec §4.C's PORTFOLIO_AUDIT
/// rendering rule.
pub struct PortfolioSummaryComponent {
    pub positions: Vec<Position>,
}

impl PromptComponent for PortfolioSummaryComponent {
    fn priority(&self) -> i32 {
        PRIORITY_PORTFOLIO_SUMMARY
    }
    fn is_relevant(&self, ctx: &QueryContext) -> bool {
        ctx.query_type == QueryType::PortfolioAudit
    }
    fn render(&self, _ctx: &QueryContext) -> String {
        let mut lines = vec!["Portfolio summary:".to_string()];
        for p in &self.positions {
            lines.push(format!(
                "  {}: qty={} value={} pnl%={}",
                p.symbol, p.qty, p.market_value, p.unrealized_pnl_pct
            ));
        }
        lines.join("\n")
    }
    fn name(&self) -> &str {
        "portfolio_summary"
    }
}

pub struct NewsComponent {
    pub articles: Vec<NewsArticle>,
}

impl PromptComponent for NewsComponent {
    fn priority(&self) -> i32 {
        PRIORITY_NEWS
    }
    fn is_relevant(&self, ctx: &QueryContext) -> bool {
        match ctx.query_type {
            QueryType::NewOpportunity | QueryType::PositionReview => ctx.include_news,
            QueryType::ComparativeAnalysis => true,
            _ => false,
        }
    }
    fn render(&self, _ctx: &QueryContext) -> String {
        if self.articles.is_empty() {
            return "Recent news: none".to_string();
        }
        let mut lines = vec!["Recent news:".to_string()];
        for a in &self.articles {
            lines.push(format!("  [{}] {}", a.source, a.headline));
        }
        lines.join("\n")
    }
    fn name(&self) -> &str {
        "news"
    }
}

pub struct MarketRegimeComponent {
    pub label: String,
}

impl PromptComponent for MarketRegimeComponent {
    fn priority(&self) -> i32 {
        PRIORITY_MARKET_REGIME
    }
    fn is_relevant(&self, ctx: &QueryContext) -> bool {
        match ctx.query_type {
            QueryType::PortfolioAudit => ctx.include_market_regime,
            QueryType::MarketRegime => true,
            _ => false,
        }
    }
    fn render(&self, _ctx: &QueryContext) -> String {
        format!("Market regime: {}", self.label)
    }
    fn name(&self) -> &str {
        "market_regime"
    }
}

pub struct ComparativeDataComponent {
    pub rows: Vec<(String, IndicatorSet)>,
}

impl PromptComponent for ComparativeDataComponent {
    fn priority(&self) -> i32 {
        PRIORITY_COMPARATIVE_DATA
    }
    fn is_relevant(&self, ctx: &QueryContext) -> bool {
        matches!(
            ctx.query_type,
            QueryType::PortfolioAudit | QueryType::ComparativeAnalysis
        )
    }
    fn render(&self, _ctx: &QueryContext) -> String {
        let mut lines = vec!["Comparative data:".to_string()];
        for (symbol, ind) in &self.rows {
            lines.push(format!(
                "  {symbol}: trend={:?} momentum={:?} rsi_14={}",
                ind.signals.trend, ind.signals.momentum, fmt_opt(ind.rsi_14)
            ));
        }
        lines.join("\n")
    }
    fn name(&self) -> &str {
        "comparative_data"
    }
}

/// Abstract structural guidance only — no concrete example figures that
/// could be copy-pasted verbatim by the model (spec §4.C/D).
pub struct TaskInstructionComponent;

impl PromptComponent for TaskInstructionComponent {
    fn priority(&self) -> i32 {
        PRIORITY_TASK_INSTRUCTION
    }
    fn is_relevant(&self, _ctx: &QueryContext) -> bool {
        true
    }
    fn render(&self, ctx: &QueryContext) -> String {
        task_instruction_text(ctx.query_type).to_string()
    }
    fn name(&self) -> &str {
        "task_instruction"
    }
}

pub struct ResponseFormatComponent;

impl PromptComponent for ResponseFormatComponent {
    fn priority(&self) -> i32 {
        PRIORITY_RESPONSE_FORMAT
    }
    fn is_relevant(&self, _ctx: &QueryContext) -> bool {
        true
    }
    fn render(&self, ctx: &QueryContext) -> String {
        use core_models::ExpectedFormat;
        let skeleton = match ctx.expected_format {
            ExpectedFormat::StandardDecision => {
                r#"{"action": "buy|sell|hold", "confidence": 0, "sentiment": "bullish|bearish|neutral", "reasoning": "", "risk_factors": []}"#
            }
            ExpectedFormat::Ranking => {
                r#"{"ranked_positions": [{"symbol": "", "rank": 0, "score": 0, "action": "keep|hold|sell", "reason": ""}], "summary": ""}"#
            }
            ExpectedFormat::Comparison => {
                r#"{"winner": {"symbol": "", "score": 0, "reason": ""}, "runner_up": null, "avoid": null}"#
            }
            ExpectedFormat::DataRequest => {
                r#"{"needs_more_data": true, "requested_data": []}"#
            }
        };
        format!("Respond with exactly one JSON object matching this shape:\n{skeleton}")
    }
    fn name(&self) -> &str {
        "response_format"
    }
}

pub struct OvernightContextComponent {
    pub summary: OvernightSummary,
}

impl PromptComponent for OvernightContextComponent {
    fn priority(&self) -> i32 {
        PRIORITY_OVERNIGHT_CONTEXT
    }
    fn is_relevant(&self, ctx: &QueryContext) -> bool {
        ctx.query_type == QueryType::PositionReview && ctx.overnight_context.is_some()
    }
    fn render(&self, ctx: &QueryContext) -> String {
        let symbol = ctx.primary_symbol.as_deref().unwrap_or("");
        match self.summary.synthesis_recommendations.get(symbol) {
            Some(rec) => format!("Overnight synthesis recommendation for {symbol}: {rec:?}"),
            None => format!("Overnight context: no synthesis recorded for {symbol}"),
        }
    }
    fn name(&self) -> &str {
        "overnight_context"
    }
}

