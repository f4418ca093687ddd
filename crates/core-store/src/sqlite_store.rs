use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use core_models::{
    Action, Decision, ExecutionOutcome, Pattern, QueryType, RiskFactor, Sentiment, Severity,
    Trigger,
};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::schema::SCHEMA_DDL;

/// Raw prompt/response/latency record for one LLM call, as described by
/// spec §4.F's `llm_interactions` table. Not part of the core data model —
/// it is a persistence-only audit artifact, so it lives in this crate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LlmInteraction {
    pub timestamp: DateTime<Utc>,
    pub symbol: Option<String>,
    pub model: String,
    pub raw_prompt: String,
    pub raw_response: String,
    pub parsed_classification: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub pnl: Decimal,
    pub win_rate: f64,
    pub trades: u32,
    pub regime_label: String,
}

/// Embedded relational store for decisions, LLM interactions, discovered
/// patterns, and daily performance aggregates (spec §4.F tables).
///
/// Writes are atomic per-entity (single-row `INSERT`/`UPDATE` per call, no
/// partial multi-table transactions); readers see either a full record or
/// none. Missing ranges return empty results, never errors, matching the
/// LearningStore contract.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn record_decision(&self, decision: &Decision) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO decisions \
             (symbol, timestamp, action, shares, price_snapshot, confidence, sentiment, \
              reasoning, risk_factors_json, quality_scores_json, llm_raw_response, \
              trigger_kind, query_type, executed, execution_outcome_json) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
            params![
                decision.symbol,
                decision.timestamp.to_rfc3339(),
                action_str(decision.action),
                decision.shares as i64,
                decision.price_snapshot.to_string(),
                decision.confidence,
                sentiment_str(decision.sentiment),
                decision.reasoning,
                serde_json::to_string(&decision.risk_factors)?,
                serde_json::to_string(&decision.quality_scores)?,
                decision.llm_raw_response,
                trigger_str(decision.trigger),
                query_type_str(decision.query_type),
                decision.executed as i64,
                serde_json::to_string(&decision.execution_outcome)?,
            ],
        )?;
        Ok(())
    }

    /// Overwrite the execution outcome on an already-recorded decision, e.g.
    /// once an order fills or a position closes.
    pub async fn update_decision_outcome(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        executed: bool,
        outcome: &ExecutionOutcome,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE decisions SET executed = ?1, execution_outcome_json = ?2 \
             WHERE symbol = ?3 AND timestamp = ?4",
            params![
                executed as i64,
                serde_json::to_string(outcome)?,
                symbol,
                timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All decisions recorded on or after `since`, most recent first. Used
    /// by `WeeklySelfCritique` (spec §4.K) to load the last 7 days of
    /// decisions and outcomes. Empty (not an error) when none qualify.
    pub async fn list_decisions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT symbol, timestamp, action, shares, price_snapshot, confidence, sentiment, \
             reasoning, risk_factors_json, quality_scores_json, llm_raw_response, trigger_kind, \
             query_type, executed, execution_outcome_json FROM decisions WHERE timestamp >= ?1 \
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i32>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                    row.get::<_, String>(11)?,
                    row.get::<_, String>(12)?,
                    row.get::<_, i64>(13)?,
                    row.get::<_, String>(14)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(
                    symbol,
                    timestamp,
                    action,
                    shares,
                    price_snapshot,
                    confidence,
                    sentiment,
                    reasoning,
                    risk_factors_json,
                    quality_scores_json,
                    llm_raw_response,
                    trigger_kind,
                    query_type,
                    executed,
                    execution_outcome_json,
                )| {
                    Ok(Decision {
                        symbol,
                        action: action_from_str(&action)?,
                        shares: shares as u64,
                        price_snapshot: Decimal::from_str(&price_snapshot)
                            .map_err(|e| StoreError::Unavailable(e.to_string()))?,
                        confidence,
                        sentiment: sentiment_from_str(&sentiment)?,
                        reasoning,
                        risk_factors: serde_json::from_str(&risk_factors_json)?,
                        quality_scores: serde_json::from_str(&quality_scores_json)?,
                        llm_raw_response,
                        timestamp: DateTime::parse_from_rfc3339(&timestamp)
                            .map_err(|e| StoreError::Unavailable(e.to_string()))?
                            .with_timezone(&Utc),
                        trigger: trigger_from_str(&trigger_kind)?,
                        query_type: query_type_from_str(&query_type)?,
                        executed: executed != 0,
                        execution_outcome: serde_json::from_str(&execution_outcome_json)?,
                    })
                },
            )
            .collect()
    }

    pub async fn record_llm_interaction(
        &self,
        interaction: &LlmInteraction,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO llm_interactions \
             (timestamp, symbol, model, raw_prompt, raw_response, parsed_classification, latency_ms) \
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                interaction.timestamp.to_rfc3339(),
                interaction.symbol,
                interaction.model,
                interaction.raw_prompt,
                interaction.raw_response,
                interaction.parsed_classification,
                interaction.latency_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub async fn record_pattern(&self, pattern: &Pattern) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO patterns \
             (id, pattern_type, conditions_json, success_rate, sample_size, avg_return, \
              risk_reward, discovered_at) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                pattern.id,
                pattern.pattern_type,
                serde_json::to_string(&pattern.conditions)?,
                pattern.success_rate,
                pattern.sample_size,
                pattern.avg_return,
                pattern.risk_reward,
                pattern.discovered_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All patterns discovered on or after `since`. Empty (not an error) when
    /// none qualify.
    pub async fn list_patterns(&self, since: DateTime<Utc>) -> Result<Vec<Pattern>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, pattern_type, conditions_json, success_rate, sample_size, avg_return, \
             risk_reward, discovered_at FROM patterns WHERE discovered_at >= ?1 \
             ORDER BY discovered_at DESC",
        )?;
        let rows = stmt
            .query_map(params![since.to_rfc3339()], |row| {
                let conditions_json: String = row.get(2)?;
                let discovered_at: String = row.get(7)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    conditions_json,
                    row.get::<_, f64>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    discovered_at,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, pattern_type, conditions_json, success_rate, sample_size, avg_return, risk_reward, discovered_at)| {
                Ok(Pattern {
                    id,
                    pattern_type,
                    conditions: serde_json::from_str(&conditions_json)?,
                    success_rate,
                    sample_size,
                    avg_return,
                    risk_reward,
                    discovered_at: DateTime::parse_from_rfc3339(&discovered_at)
                        .map_err(|e| StoreError::Unavailable(e.to_string()))?
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }

    pub async fn record_daily_performance(
        &self,
        performance: &DailyPerformance,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO daily_performance (date, pnl, win_rate, trades, regime_label) \
             VALUES (?1,?2,?3,?4,?5)",
            params![
                performance.date.to_string(),
                performance.pnl.to_string(),
                performance.win_rate,
                performance.trades,
                performance.regime_label,
            ],
        )?;
        Ok(())
    }

    /// `None` when the date has no recorded aggregate, never an error.
    pub async fn daily_performance(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailyPerformance>, StoreError> {
        let conn = self.conn.lock().await;
        let result = conn
            .query_row(
                "SELECT date, pnl, win_rate, trades, regime_label FROM daily_performance \
                 WHERE date = ?1",
                params![date.to_string()],
                |row| {
                    let pnl_str: String = row.get(1)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        pnl_str,
                        row.get::<_, f64>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        Ok(match result {
            Some((date_str, pnl_str, win_rate, trades, regime_label)) => Some(DailyPerformance {
                date: NaiveDate::from_str(&date_str)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?,
                pnl: Decimal::from_str(&pnl_str).map_err(|e| StoreError::Unavailable(e.to_string()))?,
                win_rate,
                trades,
                regime_label,
            }),
            None => None,
        })
    }
}

fn action_str(action: Action) -> &'static str {
    match action {
        Action::Buy => "buy",
        Action::Sell => "sell",
        Action::Hold => "hold",
    }
}

fn sentiment_str(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Bullish => "bullish",
        Sentiment::Bearish => "bearish",
        Sentiment::Neutral => "neutral",
    }
}

fn trigger_str(trigger: Trigger) -> &'static str {
    match trigger {
        Trigger::ScheduledCycle => "scheduled_cycle",
        Trigger::CapitalConstraint => "capital_constraint",
        Trigger::PriceAlert => "price_alert",
        Trigger::NewsEvent => "news_event",
        Trigger::TechnicalSignal => "technical_signal",
        Trigger::PerformanceConcern => "performance_concern",
        Trigger::UserRequest => "user_request",
    }
}

fn query_type_str(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::NewOpportunity => "new_opportunity",
        QueryType::PositionReview => "position_review",
        QueryType::PortfolioAudit => "portfolio_audit",
        QueryType::ComparativeAnalysis => "comparative_analysis",
        QueryType::TradePostmortem => "trade_postmortem",
        QueryType::MarketRegime => "market_regime",
        QueryType::SectorRotation => "sector_rotation",
        QueryType::RiskAssessment => "risk_assessment",
    }
}

fn action_from_str(s: &str) -> Result<Action, StoreError> {
    match s {
        "buy" => Ok(Action::Buy),
        "sell" => Ok(Action::Sell),
        "hold" => Ok(Action::Hold),
        other => Err(StoreError::Unavailable(format!("unknown action {other}"))),
    }
}

fn sentiment_from_str(s: &str) -> Result<Sentiment, StoreError> {
    match s {
        "bullish" => Ok(Sentiment::Bullish),
        "bearish" => Ok(Sentiment::Bearish),
        "neutral" => Ok(Sentiment::Neutral),
        other => Err(StoreError::Unavailable(format!("unknown sentiment {other}"))),
    }
}

fn trigger_from_str(s: &str) -> Result<Trigger, StoreError> {
    match s {
        "scheduled_cycle" => Ok(Trigger::ScheduledCycle),
        "capital_constraint" => Ok(Trigger::CapitalConstraint),
        "price_alert" => Ok(Trigger::PriceAlert),
        "news_event" => Ok(Trigger::NewsEvent),
        "technical_signal" => Ok(Trigger::TechnicalSignal),
        "performance_concern" => Ok(Trigger::PerformanceConcern),
        "user_request" => Ok(Trigger::UserRequest),
        other => Err(StoreError::Unavailable(format!("unknown trigger {other}"))),
    }
}

fn query_type_from_str(s: &str) -> Result<QueryType, StoreError> {
    match s {
        "new_opportunity" => Ok(QueryType::NewOpportunity),
        "position_review" => Ok(QueryType::PositionReview),
        "portfolio_audit" => Ok(QueryType::PortfolioAudit),
        "comparative_analysis" => Ok(QueryType::ComparativeAnalysis),
        "trade_postmortem" => Ok(QueryType::TradePostmortem),
        "market_regime" => Ok(QueryType::MarketRegime),
        "sector_rotation" => Ok(QueryType::SectorRotation),
        "risk_assessment" => Ok(QueryType::RiskAssessment),
        other => Err(StoreError::Unavailable(format!("unknown query_type {other}"))),
    }
}
