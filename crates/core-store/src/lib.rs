//! LearningStore (component F): durable memory of decisions, LLM
//! interactions, discovered patterns, and daily performance, backed by an
//! embedded SQLite database plus append-only JSON-lines artifacts and
//! per-date JSON documents (spec §4.F, artifact layout in spec §6).

pub mod artifacts;
pub mod error;
mod jsonl;
mod memory;
mod schema;
mod sqlite_store;

pub use error::StoreError;
pub use jsonl::JsonlWriter;
pub use memory::MemoryCache;
pub use sqlite_store::{DailyPerformance, LlmInteraction, SqliteStore};

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use core_models::{
    Decision, ExecutionOutcome, NewsTimeline, OvernightAnalysis, OvernightSummary, Pattern,
    UniverseEntry,
};
use serde::{Deserialize, Serialize};

use artifacts::{NewsTimelineStore, OvernightAnalysisStore, UniverseCacheStore};

const PATTERNS_CACHE_KEY: &str = "patterns:all";
const PATTERNS_CACHE_TTL: Duration = Duration::from_secs(300);

/// A single self-critique write (Friday evening `WeeklySelfCritique`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfCritiqueEntry {
    pub generated_at: DateTime<Utc>,
    pub week_ending: NaiveDate,
    pub narrative: String,
    pub adjustments: Vec<String>,
}

/// A single premarket-scanner write (06:00-hour `PremarketScanner` task).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremarketScannerEntry {
    pub generated_at: DateTime<Utc>,
    pub gap_candidates: Vec<String>,
    pub notes: String,
}

/// A single earnings-analysis write. Empty/absent unless an earnings
/// collaborator is configured — see spec Open Question (a).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsAnalysisEntry {
    pub generated_at: DateTime<Utc>,
    pub symbol: String,
    pub notes: String,
}

/// Facade over every persistence surface the Decision Core uses: the
/// relational tables (`SqliteStore`), the append-only JSONL streams named in
/// spec §6, and the per-date/TTL'd JSON artifacts (news timelines, universe
/// cache). TradingAgent and OvernightPipeline depend on this type alone,
/// never on the individual pieces.
pub struct Store {
    sqlite: SqliteStore,
    patterns_cache: MemoryCache,
    decisions_jsonl: JsonlWriter<Decision>,
    llm_conversations_jsonl: JsonlWriter<LlmInteraction>,
    self_critique_jsonl: JsonlWriter<SelfCritiqueEntry>,
    overnight_summary_jsonl: JsonlWriter<OvernightSummary>,
    premarket_scanner_jsonl: JsonlWriter<PremarketScannerEntry>,
    earnings_analysis_jsonl: JsonlWriter<EarningsAnalysisEntry>,
    news_timelines: NewsTimelineStore,
    universe_cache: UniverseCacheStore,
    overnight_analyses: OvernightAnalysisStore,
}

impl Store {
    /// `sqlite_path` backs the relational tables; `data_dir` holds every
    /// JSONL/JSON artifact file.
    pub fn open(sqlite_path: &str, data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self::new(SqliteStore::open(sqlite_path)?, data_dir))
    }

    pub fn open_in_memory(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(
            SqliteStore::open_in_memory()?,
            data_dir.as_ref().to_path_buf(),
        ))
    }

    fn new(sqlite: SqliteStore, data_dir: PathBuf) -> Self {
        Self {
            sqlite,
            patterns_cache: MemoryCache::new(64, PATTERNS_CACHE_TTL),
            decisions_jsonl: JsonlWriter::open(data_dir.join("decisions.jsonl")),
            llm_conversations_jsonl: JsonlWriter::open(data_dir.join("llm_conversations.jsonl")),
            self_critique_jsonl: JsonlWriter::open(data_dir.join("self_critique.jsonl")),
            overnight_summary_jsonl: JsonlWriter::open(data_dir.join("overnight_summary.jsonl")),
            premarket_scanner_jsonl: JsonlWriter::open(data_dir.join("premarket_scanner.jsonl")),
            earnings_analysis_jsonl: JsonlWriter::open(data_dir.join("earnings_analysis.jsonl")),
            news_timelines: NewsTimelineStore::new(&data_dir),
            universe_cache: UniverseCacheStore::new(&data_dir),
            overnight_analyses: OvernightAnalysisStore::new(&data_dir),
        }
    }

    /// Records a Decision both to the relational table (queryable by
    /// symbol/timestamp) and to the append-only `decisions.jsonl` audit log.
    pub async fn record_decision(&self, decision: &Decision) -> Result<(), StoreError> {
        self.sqlite.record_decision(decision).await?;
        self.decisions_jsonl.append(decision)?;
        Ok(())
    }

    pub async fn update_decision_outcome(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        executed: bool,
        outcome: &ExecutionOutcome,
    ) -> Result<(), StoreError> {
        self.sqlite
            .update_decision_outcome(symbol, timestamp, executed, outcome)
            .await
    }

    pub async fn record_llm_interaction(
        &self,
        interaction: &LlmInteraction,
    ) -> Result<(), StoreError> {
        self.sqlite.record_llm_interaction(interaction).await?;
        self.llm_conversations_jsonl.append(interaction)?;
        Ok(())
    }

    pub async fn record_pattern(&self, pattern: &Pattern) -> Result<(), StoreError> {
        self.sqlite.record_pattern(pattern).await?;
        self.patterns_cache.invalidate(PATTERNS_CACHE_KEY).await;
        Ok(())
    }

    /// Read-through: checks the in-memory cache first, falls back to SQLite
    /// and promotes the result on a miss, mirroring the memory-then-SQLite
    /// layering the rest of this crate's store types use.
    pub async fn list_patterns(&self, since: DateTime<Utc>) -> Result<Vec<Pattern>, StoreError> {
        if let Some(cached) = self.patterns_cache.get(PATTERNS_CACHE_KEY).await {
            let patterns: Vec<Pattern> = serde_json::from_str(&cached)?;
            return Ok(patterns
                .into_iter()
                .filter(|p| p.discovered_at >= since)
                .collect());
        }
        let patterns = self.sqlite.list_patterns(since).await?;
        self.patterns_cache
            .insert(PATTERNS_CACHE_KEY.to_string(), serde_json::to_string(&patterns)?)
            .await;
        Ok(patterns)
    }

    pub async fn list_decisions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>, StoreError> {
        self.sqlite.list_decisions_since(since).await
    }

    pub async fn record_daily_performance(
        &self,
        performance: &DailyPerformance,
    ) -> Result<(), StoreError> {
        self.sqlite.record_daily_performance(performance).await
    }

    pub async fn daily_performance(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailyPerformance>, StoreError> {
        self.sqlite.daily_performance(date).await
    }

    pub fn write_news_timeline(&self, timeline: &NewsTimeline) -> Result<(), StoreError> {
        self.news_timelines.write(timeline)
    }

    pub fn read_news_timeline(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<NewsTimeline>, StoreError> {
        self.news_timelines.read(symbol, date)
    }

    pub fn write_universe_cache(&self, entries: &[UniverseEntry]) -> Result<(), StoreError> {
        self.universe_cache.write(entries)
    }

    pub fn read_universe_cache(
        &self,
        ttl_hours: u32,
    ) -> Result<Option<Vec<UniverseEntry>>, StoreError> {
        self.universe_cache.read(ttl_hours)
    }

    pub fn write_overnight_analysis(
        &self,
        date: NaiveDate,
        analysis: &OvernightAnalysis,
    ) -> Result<(), StoreError> {
        self.overnight_analyses.write(date, analysis)
    }

    pub fn read_most_recent_overnight_analysis(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        lookback_days: i64,
    ) -> Result<Option<OvernightAnalysis>, StoreError> {
        self.overnight_analyses
            .read_most_recent(symbol, as_of, lookback_days)
    }

    pub fn append_self_critique(&self, entry: &SelfCritiqueEntry) -> Result<(), StoreError> {
        self.self_critique_jsonl.append(entry)
    }

    pub fn append_overnight_summary(&self, summary: &OvernightSummary) -> Result<(), StoreError> {
        self.overnight_summary_jsonl.append(summary)
    }

    /// The most recently appended `OvernightSummary`, read back from
    /// `overnight_summary.jsonl` — used by TradingAgent's first cycle of the
    /// day to populate `QueryContext.overnight_context`.
    pub fn most_recent_overnight_summary(&self) -> Result<Option<OvernightSummary>, StoreError> {
        Ok(self.overnight_summary_jsonl.read_all()?.into_iter().last())
    }

    /// Every persisted Decision in append order, for the `replay` CLI surface
    /// and audit tooling. Sequential, not indexed — see `JsonlWriter`'s
    /// read-back contract.
    pub fn read_all_decisions(&self) -> Result<Vec<Decision>, StoreError> {
        self.decisions_jsonl.read_all()
    }

    pub fn append_premarket_scanner(
        &self,
        entry: &PremarketScannerEntry,
    ) -> Result<(), StoreError> {
        self.premarket_scanner_jsonl.append(entry)
    }

    pub fn append_earnings_analysis(
        &self,
        entry: &EarningsAnalysisEntry,
    ) -> Result<(), StoreError> {
        self.earnings_analysis_jsonl.append(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_models::{Action, QueryType, RiskFactor, Sentiment, Trigger};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn sample_decision() -> Decision {
        Decision::new(
            "AAPL".to_string(),
            Action::Buy,
            5,
            dec!(101.10),
            72,
            Sentiment::Bullish,
            "reasoning".to_string(),
            vec![RiskFactor {
                severity: core_models::Severity::Low,
                text: "liquidity thin after hours".to_string(),
            }],
            BTreeMap::new(),
            "{}".to_string(),
            Trigger::ScheduledCycle,
            QueryType::NewOpportunity,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn record_decision_writes_both_sqlite_and_jsonl() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let decision = sample_decision();

        store.record_decision(&decision).await.unwrap();

        let jsonl_path = dir.path().join("decisions.jsonl");
        let contents = std::fs::read_to_string(jsonl_path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn patterns_cache_invalidated_on_write() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let since = Utc::now() - chrono::Duration::days(1);

        assert!(store.list_patterns(since).await.unwrap().is_empty());

        store
            .record_pattern(&Pattern {
                id: "p1".to_string(),
                pattern_type: "rsi_reversal".to_string(),
                conditions: BTreeMap::new(),
                success_rate: 0.65,
                sample_size: 12,
                avg_return: 0.02,
                risk_reward: 1.5,
                discovered_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(store.list_patterns(since).await.unwrap().len(), 1);
    }
}
