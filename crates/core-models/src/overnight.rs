use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::decision::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Shallow,
    Standard,
    Deep,
}

/// One request/response exchange in an iterative-analyst session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub prompt: String,
    pub response: String,
    pub requested_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRecommendation {
    pub action: Action,
    pub confidence: i32,
    pub entry_price: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub reasoning: String,
}

/// Deep per-symbol analysis artifact produced by `EveningDeepLearning`,
/// consumed by TradingAgent's overnight-handoff step the next morning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvernightAnalysis {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub iterations: u32,
    pub conversation_history: Vec<ConversationTurn>,
    pub final_recommendation: FinalRecommendation,
    pub analysis_depth: AnalysisDepth,
}

impl OvernightAnalysis {
    /// Whether this analysis is eligible to be executed first-thing per
    /// spec §4.J step 3: a stored sell recommendation, confident enough for
    /// the active profile, no older than 18 hours.
    pub fn is_actionable_sell(&self, min_sell_confidence: i32, now: DateTime<Utc>) -> bool {
        self.final_recommendation.action == Action::Sell
            && self.final_recommendation.confidence >= min_sell_confidence
            && (now - self.timestamp) <= chrono::Duration::hours(18)
    }
}

/// A discovered recurring condition → outcome relationship, produced during
/// evening analysis. Derived, never authoritative input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub pattern_type: String,
    pub conditions: BTreeMap<String, String>,
    pub success_rate: f64,
    pub sample_size: u32,
    pub avg_return: f64,
    pub risk_reward: f64,
    pub discovered_at: DateTime<Utc>,
}

/// Aggregated hand-off produced by `MorningHandoff` at 06:00: synthesis
/// recommendations, earnings calendar, and gap candidates. TradingAgent
/// reads this on its first cycle of the day via `QueryContext.overnight_context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvernightSummary {
    pub generated_at: DateTime<Utc>,
    pub synthesis_recommendations: BTreeMap<String, crate::news::NewsRecommendation>,
    /// Empty when no earnings-calendar collaborator is configured — per spec
    /// Open Question (a), the earnings task becomes a no-op rather than
    /// guessing dates heuristically.
    pub earnings_calendar: BTreeMap<String, DateTime<Utc>>,
    pub gap_candidates: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(action: Action, confidence: i32, hours_ago: i64) -> OvernightAnalysis {
        OvernightAnalysis {
            symbol: "MSFT".to_string(),
            timestamp: Utc::now() - chrono::Duration::hours(hours_ago),
            iterations: 3,
            conversation_history: vec![],
            final_recommendation: FinalRecommendation {
                action,
                confidence,
                entry_price: None,
                target_price: None,
                stop_loss: None,
                reasoning: "r".to_string(),
            },
            analysis_depth: AnalysisDepth::Deep,
        }
    }

    #[test]
    fn actionable_sell_requires_confidence_and_recency() {
        let now = Utc::now();
        assert!(analysis(Action::Sell, 78, 12).is_actionable_sell(60, now));
        assert!(!analysis(Action::Sell, 30, 12).is_actionable_sell(60, now));
        assert!(!analysis(Action::Sell, 78, 20).is_actionable_sell(60, now));
        assert!(!analysis(Action::Hold, 78, 12).is_actionable_sell(60, now));
    }
}
