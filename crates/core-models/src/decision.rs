use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::query_context::{QueryType, Trigger};
use crate::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub severity: Severity,
    pub text: String,
}

/// Outcome of an order submission, recorded verbatim onto the Decision that
/// triggered it (audit invariant: no order without a prior persisted
/// Decision, and the Decision stores the real outcome, not an assumption).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    NotAttempted,
    Filled { order_id: String, fill_price: Decimal },
    FillTimeout,
    CancelledPostSubmit { order_id: String },
    BrokerError { message: String },
}

/// A validated, typed trading decision. Immutable after recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub action: Action,
    pub shares: u64,
    pub price_snapshot: Decimal,
    pub confidence: i32,
    pub sentiment: Sentiment,
    pub reasoning: String,
    pub risk_factors: Vec<RiskFactor>,
    pub quality_scores: BTreeMap<String, i32>,
    pub llm_raw_response: String,
    pub timestamp: DateTime<Utc>,
    pub trigger: Trigger,
    pub query_type: QueryType,
    pub executed: bool,
    pub execution_outcome: ExecutionOutcome,
}

impl Decision {
    /// Construct a Decision, rejecting out-of-range confidence rather than
    /// clamping it — malformed LLM output is a parse failure upstream, never
    /// silently coerced here.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: String,
        action: Action,
        shares: u64,
        price_snapshot: Decimal,
        confidence: i32,
        sentiment: Sentiment,
        reasoning: String,
        risk_factors: Vec<RiskFactor>,
        quality_scores: BTreeMap<String, i32>,
        llm_raw_response: String,
        trigger: Trigger,
        query_type: QueryType,
    ) -> Result<Self, ModelError> {
        if !(0..=100).contains(&confidence) {
            return Err(ModelError::Invariant(format!(
                "confidence {confidence} out of [0,100]"
            )));
        }
        Ok(Self {
            symbol,
            action,
            shares,
            price_snapshot,
            confidence,
            sentiment,
            reasoning,
            risk_factors,
            quality_scores,
            llm_raw_response,
            timestamp: Utc::now(),
            trigger,
            query_type,
            executed: false,
            execution_outcome: ExecutionOutcome::NotAttempted,
        })
    }
}

/// Result of a RiskGate evaluation. Always derived; never persisted
/// standalone — it rides along with the Decision it gated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub approved: bool,
    pub reason: String,
    pub warnings: Vec<String>,
}

impl RiskResult {
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
            warnings: Vec::new(),
        }
    }

    pub fn approve_with_warning(reason: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
            warnings: vec![warning.into()],
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankAction {
    Keep,
    Hold,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPosition {
    pub symbol: String,
    pub rank: u32,
    pub score: i32,
    pub action: RankAction,
    pub reason: String,
}

/// A model-produced prioritized ordering over held positions.
///
/// Invariant: ranks are `{1..N}` without gaps; for any two entries from the
/// same ranking, `action == sell` implies its score is lower than any
/// `action == keep` entry's score. Both invariants are enforced in
/// `Ranking::new`, never repaired — malformed rankings are rejected by the
/// ResponseParser, per spec Open Question (b).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub ranked_positions: Vec<RankedPosition>,
    pub summary: String,
}

impl Ranking {
    pub fn new(ranked_positions: Vec<RankedPosition>, summary: String) -> Result<Self, ModelError> {
        let n = ranked_positions.len() as u32;
        let mut ranks: Vec<u32> = ranked_positions.iter().map(|p| p.rank).collect();
        ranks.sort_unstable();
        if ranks != (1..=n).collect::<Vec<_>>() {
            return Err(ModelError::Invariant(format!(
                "ranks are not a permutation of 1..{n}: {ranks:?}"
            )));
        }

        let max_sell_score = ranked_positions
            .iter()
            .filter(|p| p.action == RankAction::Sell)
            .map(|p| p.score)
            .max();
        let min_keep_score = ranked_positions
            .iter()
            .filter(|p| p.action == RankAction::Keep)
            .map(|p| p.score)
            .min();
        if let (Some(sell_max), Some(keep_min)) = (max_sell_score, min_keep_score) {
            if sell_max >= keep_min {
                return Err(ModelError::Invariant(format!(
                    "a sell-ranked entry (score {sell_max}) does not score below every keep-ranked entry (min {keep_min})"
                )));
            }
        }

        Ok(Self {
            ranked_positions,
            summary,
        })
    }
}
