use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    NewOpportunity,
    PositionReview,
    PortfolioAudit,
    ComparativeAnalysis,
    TradePostmortem,
    MarketRegime,
    SectorRotation,
    RiskAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    ScheduledCycle,
    CapitalConstraint,
    PriceAlert,
    NewsEvent,
    TechnicalSignal,
    PerformanceConcern,
    UserRequest,
}

/// Enumerated risk/behavior preset controlling confidence thresholds and the
/// phrasing of the TaskInstruction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingProfile {
    Conservative,
    Moderate,
    Aggressive,
    Rotator,
    Momentum,
    Value,
}

/// The authoritative per-profile confidence threshold table (spec §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileThresholds {
    pub min_buy_confidence: i32,
    pub min_sell_confidence: i32,
    pub posture: &'static str,
}

impl TradingProfile {
    pub fn thresholds(&self) -> ProfileThresholds {
        match self {
            TradingProfile::Conservative => ProfileThresholds {
                min_buy_confidence: 75,
                min_sell_confidence: 70,
                posture: "capital preservation",
            },
            TradingProfile::Moderate => ProfileThresholds {
                min_buy_confidence: 65,
                min_sell_confidence: 60,
                posture: "balanced",
            },
            TradingProfile::Aggressive => ProfileThresholds {
                min_buy_confidence: 55,
                min_sell_confidence: 50,
                posture: "momentum",
            },
            TradingProfile::Rotator => ProfileThresholds {
                min_buy_confidence: 60,
                min_sell_confidence: 40,
                posture: "prioritize selling to free capital",
            },
            TradingProfile::Momentum => ProfileThresholds {
                min_buy_confidence: 55,
                min_sell_confidence: 50,
                posture: "ride trends",
            },
            TradingProfile::Value => ProfileThresholds {
                min_buy_confidence: 70,
                min_sell_confidence: 65,
                posture: "contrarian",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedFormat {
    StandardDecision,
    Ranking,
    Comparison,
    DataRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Minimal,
    Standard,
    Detailed,
}

/// Everything PromptAssembler needs to select, filter, and render prompt
/// components for one LLM query. Constructed by TradingAgent (or the
/// OvernightPipeline / NewsTimeline for their own query types).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryContext {
    pub query_type: QueryType,
    pub trigger: Trigger,
    pub profile: TradingProfile,
    pub primary_symbol: Option<String>,
    pub comparison_symbols: Vec<String>,
    pub portfolio_state: Option<crate::account::AccountState>,
    pub overnight_context: Option<crate::overnight::OvernightSummary>,
    pub expected_format: ExpectedFormat,
    pub include_news: bool,
    pub include_market_regime: bool,
    pub detail_level: DetailLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_table_matches_spec() {
        assert_eq!(
            TradingProfile::Rotator.thresholds().min_sell_confidence,
            40
        );
        assert_eq!(TradingProfile::Conservative.thresholds().min_buy_confidence, 75);
        assert_eq!(TradingProfile::Value.thresholds().min_sell_confidence, 65);
    }
}
