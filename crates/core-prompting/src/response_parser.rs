//! ResponseParser (component D, spec §4.D): turns a raw LLM string into a
//! typed, quality-scored result, or a specific parse/schema/copy-paste
//! failure. Never coerces malformed output — every invalid field is
//! reported, not silently fixed (spec §3 invariant).

use std::collections::BTreeMap;

use core_models::{Action, QueryContext, RankAction, RankedPosition, Ranking, RiskFactor, Sentiment, Severity, Trigger};
use serde::Deserialize;

use crate::error::PromptingError;
use crate::json_extract::extract_json;
use crate::task_instructions::task_instruction_text;

/// The model's proposed action and supporting narrative, validated but not
/// yet combined with the price/share-count data the caller (TradingAgent)
/// supplies to build a full `Decision`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDecision {
    pub action: Action,
    pub confidence: i32,
    pub sentiment: Sentiment,
    pub reasoning: String,
    pub risk_factors: Vec<RiskFactor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonCandidate {
    pub symbol: String,
    pub score: i32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub winner: ComparisonCandidate,
    pub runner_up: Option<ComparisonCandidate>,
    pub avoid: Option<ComparisonCandidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub requested_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResult {
    Decision(ModelDecision),
    Ranking(Ranking),
    Comparison(Comparison),
    DataRequest(DataRequest),
}

/// A successfully parsed response plus the quality sub-scores computed for
/// it (spec §4.D step 4), keyed by sub-score name with an `"overall"` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub result: ParsedResult,
    pub quality_scores: BTreeMap<String, i32>,
}

#[derive(Deserialize)]
struct RawStandardDecision {
    action: String,
    confidence: i32,
    sentiment: String,
    reasoning: String,
    #[serde(default)]
    risk_factors: Vec<RawRiskFactor>,
}

#[derive(Deserialize)]
struct RawRiskFactor {
    severity: String,
    text: String,
}

#[derive(Deserialize)]
struct RawRankedPosition {
    symbol: String,
    rank: u32,
    score: i32,
    action: String,
    reason: String,
}

#[derive(Deserialize)]
struct RawRanking {
    ranked_positions: Vec<RawRankedPosition>,
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct RawComparisonCandidate {
    symbol: String,
    score: i32,
    reason: String,
}

#[derive(Deserialize)]
struct RawComparison {
    winner: RawComparisonCandidate,
    runner_up: Option<RawComparisonCandidate>,
    avoid: Option<RawComparisonCandidate>,
}

#[derive(Deserialize)]
struct RawDataRequest {
    needs_more_data: bool,
    #[serde(default)]
    requested_data: Vec<String>,
}

pub struct ResponseParser;

impl ResponseParser {
    /// Runs the full pipeline: extract → parse → schema-validate →
    /// quality-score → anti-copy-paste guard (spec §4.D steps 1-5).
    pub fn parse(raw: &str, ctx: &QueryContext) -> Result<ParseOutcome, PromptingError> {
        use core_models::ExpectedFormat;

        let value = extract_json(raw)?;

        let (result, reasoning_text) = match ctx.expected_format {
            ExpectedFormat::StandardDecision => {
                let raw_decision: RawStandardDecision = serde_json::from_value(value)
                    .map_err(|e| PromptingError::SchemaError(e.to_string()))?;
                let decision = Self::validate_standard_decision(raw_decision)?;
                let reasoning = decision.reasoning.clone();
                (ParsedResult::Decision(decision), reasoning)
            }
            ExpectedFormat::Ranking => {
                let raw_ranking: RawRanking = serde_json::from_value(value)
                    .map_err(|e| PromptingError::SchemaError(e.to_string()))?;
                let ranking = Self::validate_ranking(raw_ranking)?;
                let reasoning = ranking.summary.clone();
                (ParsedResult::Ranking(ranking), reasoning)
            }
            ExpectedFormat::Comparison => {
                let raw_comparison: RawComparison = serde_json::from_value(value)
                    .map_err(|e| PromptingError::SchemaError(e.to_string()))?;
                let comparison = Self::validate_comparison(raw_comparison);
                let reasoning = comparison.winner.reason.clone();
                (ParsedResult::Comparison(comparison), reasoning)
            }
            ExpectedFormat::DataRequest => {
                let raw_request: RawDataRequest = serde_json::from_value(value)
                    .map_err(|e| PromptingError::SchemaError(e.to_string()))?;
                let request = Self::validate_data_request(raw_request)?;
                (ParsedResult::DataRequest(request), String::new())
            }
        };

        if !reasoning_text.is_empty() {
            let template = task_instruction_text(ctx.query_type);
            if template.contains(&reasoning_text) {
                return Err(PromptingError::CopyPasteSuspected);
            }
        }

        let quality_scores = Self::quality_scores(&result, ctx);

        Ok(ParseOutcome {
            result,
            quality_scores,
        })
    }

    fn validate_standard_decision(raw: RawStandardDecision) -> Result<ModelDecision, PromptingError> {
        let action = parse_action(&raw.action)?;
        let sentiment = parse_sentiment(&raw.sentiment)?;
        if !(0..=100).contains(&raw.confidence) {
            return Err(PromptingError::SchemaError(format!(
                "confidence {} out of [0,100]",
                raw.confidence
            )));
        }
        if raw.reasoning.trim().is_empty() {
            return Err(PromptingError::SchemaError("reasoning must be non-empty".to_string()));
        }
        let risk_factors = raw
            .risk_factors
            .into_iter()
            .map(|rf| {
                Ok(RiskFactor {
                    severity: parse_severity(&rf.severity)?,
                    text: rf.text,
                })
            })
            .collect::<Result<Vec<_>, PromptingError>>()?;

        Ok(ModelDecision {
            action,
            confidence: raw.confidence,
            sentiment,
            reasoning: raw.reasoning,
            risk_factors,
        })
    }

    fn validate_ranking(raw: RawRanking) -> Result<Ranking, PromptingError> {
        let ranked_positions = raw
            .ranked_positions
            .into_iter()
            .map(|p| {
                Ok(RankedPosition {
                    symbol: p.symbol,
                    rank: p.rank,
                    score: p.score,
                    action: parse_rank_action(&p.action)?,
                    reason: p.reason,
                })
            })
            .collect::<Result<Vec<_>, PromptingError>>()?;

        Ranking::new(ranked_positions, raw.summary).map_err(|e| PromptingError::SchemaError(e.to_string()))
    }

    fn validate_comparison(raw: RawComparison) -> Comparison {
        Comparison {
            winner: ComparisonCandidate {
                symbol: raw.winner.symbol,
                score: raw.winner.score,
                reason: raw.winner.reason,
            },
            runner_up: raw.runner_up.map(|c| ComparisonCandidate {
                symbol: c.symbol,
                score: c.score,
                reason: c.reason,
            }),
            avoid: raw.avoid.map(|c| ComparisonCandidate {
                symbol: c.symbol,
                score: c.score,
                reason: c.reason,
            }),
        }
    }

    fn validate_data_request(raw: RawDataRequest) -> Result<DataRequest, PromptingError> {
        if !raw.needs_more_data || raw.requested_data.is_empty() {
            return Err(PromptingError::SchemaError(
                "data_request requires needs_more_data=true and non-empty requested_data".to_string(),
            ));
        }
        Ok(DataRequest {
            requested_data: raw.requested_data,
        })
    }

    fn quality_scores(result: &ParsedResult, ctx: &QueryContext) -> BTreeMap<String, i32> {
        match result {
            ParsedResult::Decision(decision) => Self::standard_decision_scores(decision),
            ParsedResult::Ranking(ranking) => Self::ranking_scores(ranking, ctx),
            ParsedResult::Comparison(comparison) => Self::comparison_scores(comparison),
            ParsedResult::DataRequest(_) => BTreeMap::new(),
        }
    }

    fn standard_decision_scores(decision: &ModelDecision) -> BTreeMap<String, i32> {
        let decisiveness = if decision.action == Action::Hold {
            (decision.confidence / 2).clamp(0, 100)
        } else {
            decision.confidence.clamp(0, 100)
        };

        let specificity = {
            let hits = ["$", "%", "rsi", "macd", "sma", "ema", "bollinger", "atr", "support", "resistance"]
                .iter()
                .filter(|kw| decision.reasoning.to_lowercase().contains(*kw))
                .count();
            (hits * 20).min(100) as i32
        };

        let risk_awareness = {
            let weighted: i32 = decision
                .risk_factors
                .iter()
                .map(|rf| match rf.severity {
                    Severity::Low => 15,
                    Severity::Medium => 25,
                    Severity::High => 35,
                })
                .sum();
            weighted.min(100)
        };

        let reasoning_depth = {
            let word_count = decision.reasoning.split_whitespace().count();
            (word_count * 4).min(100) as i32
        };

        let overall = (decisiveness as f64 * 0.3
            + specificity as f64 * 0.25
            + risk_awareness as f64 * 0.2
            + reasoning_depth as f64 * 0.25)
            .round() as i32;

        BTreeMap::from([
            ("decisiveness".to_string(), decisiveness),
            ("specificity".to_string(), specificity),
            ("risk_awareness".to_string(), risk_awareness),
            ("reasoning_depth".to_string(), reasoning_depth),
            ("overall".to_string(), overall),
        ])
    }

    fn ranking_scores(ranking: &Ranking, ctx: &QueryContext) -> BTreeMap<String, i32> {
        // Ranking::new already rejected gapped ranks, so any value that
        // reaches here is a full permutation.
        let rank_distribution = 100;

        let score_separation = {
            let scores: Vec<f64> = ranking.ranked_positions.iter().map(|p| p.score as f64).collect();
            if scores.len() < 2 {
                0
            } else {
                let mean = scores.iter().sum::<f64>() / scores.len() as f64;
                let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
                (variance.sqrt().min(50.0) * 2.0).round() as i32
            }
        };

        let action_clarity = if ctx.trigger == Trigger::CapitalConstraint {
            if ranking
                .ranked_positions
                .iter()
                .any(|p| p.action == RankAction::Sell)
            {
                100
            } else {
                0
            }
        } else {
            100
        };

        let reasoning_quality = ((ranking.summary.split_whitespace().count() * 4).min(100)) as i32;

        let overall = ((rank_distribution + score_separation + action_clarity + reasoning_quality) as f64 / 4.0)
            .round() as i32;

        BTreeMap::from([
            ("rank_distribution".to_string(), rank_distribution),
            ("score_separation".to_string(), score_separation),
            ("action_clarity".to_string(), action_clarity),
            ("reasoning_quality".to_string(), reasoning_quality),
            ("overall".to_string(), overall),
        ])
    }

    fn comparison_scores(comparison: &Comparison) -> BTreeMap<String, i32> {
        let decisiveness = comparison.winner.score.clamp(0, 100);

        let differentiation = {
            let scores: Vec<i32> = std::iter::once(comparison.winner.score)
                .chain(comparison.runner_up.as_ref().map(|c| c.score))
                .chain(comparison.avoid.as_ref().map(|c| c.score))
                .collect();
            let spread = scores.iter().max().copied().unwrap_or(0) - scores.iter().min().copied().unwrap_or(0);
            spread.clamp(0, 100)
        };

        let reasoning_clarity = ((comparison.winner.reason.split_whitespace().count() * 4).min(100)) as i32;

        let recommendation_strength = if comparison.runner_up.is_some() || comparison.avoid.is_some() {
            100
        } else {
            60
        };

        let overall = ((decisiveness + differentiation + reasoning_clarity + recommendation_strength) as f64 / 4.0)
            .round() as i32;

        BTreeMap::from([
            ("decisiveness".to_string(), decisiveness),
            ("differentiation".to_string(), differentiation),
            ("reasoning_clarity".to_string(), reasoning_clarity),
            ("recommendation_strength".to_string(), recommendation_strength),
            ("overall".to_string(), overall),
        ])
    }
}

fn parse_action(s: &str) -> Result<Action, PromptingError> {
    match s {
        "buy" => Ok(Action::Buy),
        "sell" => Ok(Action::Sell),
        "hold" => Ok(Action::Hold),
        other => Err(PromptingError::SchemaError(format!("unknown action {other:?}"))),
    }
}

fn parse_sentiment(s: &str) -> Result<Sentiment, PromptingError> {
    match s {
        "bullish" => Ok(Sentiment::Bullish),
        "bearish" => Ok(Sentiment::Bearish),
        "neutral" => Ok(Sentiment::Neutral),
        other => Err(PromptingError::SchemaError(format!("unknown sentiment {other:?}"))),
    }
}

fn parse_severity(s: &str) -> Result<Severity, PromptingError> {
    match s.to_uppercase().as_str() {
        "LOW" => Ok(Severity::Low),
        "MEDIUM" => Ok(Severity::Medium),
        "HIGH" => Ok(Severity::High),
        other => Err(PromptingError::SchemaError(format!("unknown severity {other:?}"))),
    }
}

fn parse_rank_action(s: &str) -> Result<RankAction, PromptingError> {
    match s {
        "keep" => Ok(RankAction::Keep),
        "hold" => Ok(RankAction::Hold),
        "sell" => Ok(RankAction::Sell),
        other => Err(PromptingError::SchemaError(format!("unknown rank action {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_models::{DetailLevel, ExpectedFormat, QueryType, TradingProfile};

    fn ctx(query_type: QueryType, expected_format: ExpectedFormat, trigger: Trigger) -> QueryContext {
        QueryContext {
            query_type,
            trigger,
            profile: TradingProfile::Moderate,
            primary_symbol: Some("AAPL".to_string()),
            comparison_symbols: vec![],
            portfolio_state: None,
            overnight_context: None,
            expected_format,
            include_news: false,
            include_market_regime: false,
            detail_level: DetailLevel::Standard,
        }
    }

    #[test]
    fn parses_valid_standard_decision() {
        let raw = r#"{"action": "buy", "confidence": 72, "sentiment": "bullish",
            "reasoning": "RSI is oversold at 28 and price bounced off the $150 support level with rising volume",
            "risk_factors": [{"severity": "LOW", "text": "thin after-hours liquidity"}]}"#;
        let outcome = ResponseParser::parse(
            raw,
            &ctx(QueryType::NewOpportunity, ExpectedFormat::StandardDecision, Trigger::ScheduledCycle),
        )
        .unwrap();
        match outcome.result {
            ParsedResult::Decision(d) => {
                assert_eq!(d.action, Action::Buy);
                assert_eq!(d.confidence, 72);
            }
            _ => panic!("expected Decision"),
        }
        assert!(outcome.quality_scores.contains_key("overall"));
    }

    #[test]
    fn rejects_out_of_range_confidence_as_schema_error() {
        let raw = r#"{"action": "buy", "confidence": 150, "sentiment": "bullish", "reasoning": "x", "risk_factors": []}"#;
        let err = ResponseParser::parse(
            raw,
            &ctx(QueryType::NewOpportunity, ExpectedFormat::StandardDecision, Trigger::ScheduledCycle),
        )
        .unwrap_err();
        assert!(matches!(err, PromptingError::SchemaError(_)));
    }

    #[test]
    fn no_json_object_is_parse_error() {
        let err = ResponseParser::parse(
            "I'd rather not answer that.",
            &ctx(QueryType::NewOpportunity, ExpectedFormat::StandardDecision, Trigger::ScheduledCycle),
        )
        .unwrap_err();
        assert!(matches!(err, PromptingError::ParseError { .. }));
    }

    #[test]
    fn reasoning_copied_from_task_instruction_is_suspected() {
        let template = task_instruction_text(QueryType::NewOpportunity);
        let raw = serde_json::json!({
            "action": "buy",
            "confidence": 70,
            "sentiment": "bullish",
            "reasoning": template,
            "risk_factors": [],
        })
        .to_string();
        let err = ResponseParser::parse(
            &raw,
            &ctx(QueryType::NewOpportunity, ExpectedFormat::StandardDecision, Trigger::ScheduledCycle),
        )
        .unwrap_err();
        assert!(matches!(err, PromptingError::CopyPasteSuspected));
    }

    #[test]
    fn parses_valid_ranking() {
        let raw = r#"{"ranked_positions": [
            {"symbol": "AAPL", "rank": 1, "score": 90, "action": "keep", "reason": "strong trend"},
            {"symbol": "MSFT", "rank": 2, "score": 40, "action": "sell", "reason": "weak momentum"}
        ], "summary": "Prioritize AAPL, free capital from MSFT given tight buying power"}"#;
        let outcome = ResponseParser::parse(
            raw,
            &ctx(QueryType::PortfolioAudit, ExpectedFormat::Ranking, Trigger::CapitalConstraint),
        )
        .unwrap();
        match outcome.result {
            ParsedResult::Ranking(r) => assert_eq!(r.ranked_positions.len(), 2),
            _ => panic!("expected Ranking"),
        }
        assert_eq!(outcome.quality_scores["action_clarity"], 100);
    }

    #[test]
    fn ranking_with_gapped_ranks_is_schema_error() {
        let raw = r#"{"ranked_positions": [
            {"symbol": "AAPL", "rank": 1, "score": 90, "action": "keep", "reason": "r"},
            {"symbol": "MSFT", "rank": 3, "score": 40, "action": "sell", "reason": "r"}
        ], "summary": "s"}"#;
        let err = ResponseParser::parse(
            raw,
            &ctx(QueryType::PortfolioAudit, ExpectedFormat::Ranking, Trigger::ScheduledCycle),
        )
        .unwrap_err();
        assert!(matches!(err, PromptingError::SchemaError(_)));
    }

    #[test]
    fn parses_valid_comparison() {
        let raw = r#"{"winner": {"symbol": "AAPL", "score": 85, "reason": "strongest relative momentum"},
            "runner_up": {"symbol": "MSFT", "score": 60, "reason": "steady but lagging"},
            "avoid": null}"#;
        let outcome = ResponseParser::parse(
            raw,
            &ctx(QueryType::ComparativeAnalysis, ExpectedFormat::Comparison, Trigger::ScheduledCycle),
        )
        .unwrap();
        match outcome.result {
            ParsedResult::Comparison(c) => assert_eq!(c.winner.symbol, "AAPL"),
            _ => panic!("expected Comparison"),
        }
    }

    #[test]
    fn parses_valid_data_request() {
        let raw = r#"{"needs_more_data": true, "requested_data": ["volume_profile"]}"#;
        let outcome = ResponseParser::parse(
            raw,
            &ctx(QueryType::NewOpportunity, ExpectedFormat::DataRequest, Trigger::ScheduledCycle),
        )
        .unwrap();
        match outcome.result {
            ParsedResult::DataRequest(d) => assert_eq!(d.requested_data, vec!["volume_profile".to_string()]),
            _ => panic!("expected DataRequest"),
        }
    }

    #[test]
    fn data_request_without_requested_data_is_schema_error() {
        let raw = r#"{"needs_more_data": true, "requested_data": []}"#;
        let err = ResponseParser::parse(
            raw,
            &ctx(QueryType::NewOpportunity, ExpectedFormat::DataRequest, Trigger::ScheduledCycle),
        )
        .unwrap_err();
        assert!(matches!(err, PromptingError::SchemaError(_)));
    }
}
