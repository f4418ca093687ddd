use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use core_models::{NewsTimeline, OvernightAnalysis, UniverseEntry};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Per-date structured document of every symbol's news timeline, persisted
/// as `news_timeline_YYYYMMDD.json` (spec §6 artifact layout; spec §4.F:
/// "news_timelines: persisted per (date) as a structured document").
pub struct NewsTimelineStore {
    dir: PathBuf,
}

impl NewsTimelineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("news_timeline_{}.json", date.format("%Y%m%d")))
    }

    /// Insert or replace one symbol's timeline within the date's document.
    pub fn write(&self, timeline: &NewsTimeline) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(timeline.date);
        let mut document: BTreeMap<String, NewsTimeline> = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        document.insert(timeline.symbol.clone(), timeline.clone());
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// `None` when no timeline has been written for this (symbol, date) —
    /// never an error, per the LearningStore's missing-range contract.
    pub fn read(&self, symbol: &str, date: NaiveDate) -> Result<Option<NewsTimeline>, StoreError> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(None);
        }
        let document: BTreeMap<String, NewsTimeline> =
            serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        Ok(document.get(symbol).cloned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UniverseCacheDocument {
    generated_at: DateTime<Utc>,
    entries: Vec<UniverseEntry>,
}

/// `universe_cache.json`: the UniverseManager's last `build()` result, with
/// a caller-supplied TTL (default 24h per spec §4.G) enforced on read.
pub struct UniverseCacheStore {
    path: PathBuf,
}

impl UniverseCacheStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("universe_cache.json"),
        }
    }

    pub fn write(&self, entries: &[UniverseEntry]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let document = UniverseCacheDocument {
            generated_at: Utc::now(),
            entries: entries.to_vec(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// `None` when there is no cache file yet, or it has aged past
    /// `ttl_hours` — the caller (UniverseManager) rebuilds from scratch
    /// either way, so this is never an error.
    pub fn read(&self, ttl_hours: u32) -> Result<Option<Vec<UniverseEntry>>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let document: UniverseCacheDocument =
            serde_json::from_str(&std::fs::read_to_string(&self.path)?)?;
        let age = Utc::now() - document.generated_at;
        if age > chrono::Duration::hours(ttl_hours as i64) {
            return Ok(None);
        }
        Ok(Some(document.entries))
    }
}

/// Per-date structured document of every symbol's `EveningDeepLearning`
/// output, one file per date mirroring `NewsTimelineStore` (spec §4.F:
/// "overnight_analyses: per-symbol, per-date deep-analysis artifacts").
pub struct OvernightAnalysisStore {
    dir: PathBuf,
}

impl OvernightAnalysisStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("overnight_analysis_{}.json", date.format("%Y%m%d")))
    }

    pub fn write(&self, date: NaiveDate, analysis: &OvernightAnalysis) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(date);
        let mut document: BTreeMap<String, OvernightAnalysis> = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        document.insert(analysis.symbol.clone(), analysis.clone());
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }

    /// `None` when no analysis has been written for this (symbol, date).
    pub fn read(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<OvernightAnalysis>, StoreError> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(None);
        }
        let document: BTreeMap<String, OvernightAnalysis> =
            serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        Ok(document.get(symbol).cloned())
    }

    /// The most recent analysis for `symbol` across the last `lookback_days`
    /// date documents. Used by TradingAgent's morning hand-off (spec §4.J
    /// step 3): "Load the most recent OvernightAnalysis per held symbol".
    pub fn read_most_recent(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        lookback_days: i64,
    ) -> Result<Option<OvernightAnalysis>, StoreError> {
        for offset in 0..=lookback_days {
            let date = as_of - chrono::Duration::days(offset);
            if let Some(analysis) = self.read(symbol, date)? {
                return Ok(Some(analysis));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_models::UniverseReason;
    use tempfile::tempdir;

    fn timeline(symbol: &str, date: NaiveDate) -> NewsTimeline {
        NewsTimeline::new(symbol, date)
    }

    #[test]
    fn news_timeline_round_trips_by_symbol_and_date() {
        let dir = tempdir().unwrap();
        let store = NewsTimelineStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2026, 7, 29).unwrap();

        store.write(&timeline("AAPL", date)).unwrap();
        store.write(&timeline("MSFT", date)).unwrap();

        assert!(store.read("AAPL", date).unwrap().is_some());
        assert!(store.read("MSFT", date).unwrap().is_some());
        assert!(store.read("TSLA", date).unwrap().is_none());
    }

    #[test]
    fn missing_news_timeline_date_is_none() {
        let dir = tempdir().unwrap();
        let store = NewsTimelineStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(store.read("AAPL", date).unwrap().is_none());
    }

    #[test]
    fn universe_cache_round_trips_within_ttl() {
        let dir = tempdir().unwrap();
        let store = UniverseCacheStore::new(dir.path());
        let entries = vec![UniverseEntry::new("AAPL", UniverseReason::Holdings, 1)];

        store.write(&entries).unwrap();
        let read_back = store.read(24).unwrap().unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].symbol, "AAPL");
    }

    #[test]
    fn universe_cache_expires_past_ttl() {
        let dir = tempdir().unwrap();
        let store = UniverseCacheStore::new(dir.path());
        store
            .write(&[UniverseEntry::new("AAPL", UniverseReason::Holdings, 1)])
            .unwrap();

        assert!(store.read(0).unwrap().is_none());
    }

    #[test]
    fn missing_universe_cache_file_is_none() {
        let dir = tempdir().unwrap();
        let store = UniverseCacheStore::new(dir.path());
        assert!(store.read(24).unwrap().is_none());
    }

    fn analysis(symbol: &str) -> OvernightAnalysis {
        use core_models::{Action, AnalysisDepth, FinalRecommendation};
        OvernightAnalysis {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            iterations: 3,
            conversation_history: vec![],
            final_recommendation: FinalRecommendation {
                action: Action::Sell,
                confidence: 78,
                entry_price: None,
                target_price: None,
                stop_loss: None,
                reasoning: "r".to_string(),
            },
            analysis_depth: AnalysisDepth::Deep,
        }
    }

    #[test]
    fn overnight_analysis_round_trips_by_symbol_and_date() {
        let dir = tempdir().unwrap();
        let store = OvernightAnalysisStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();

        store.write(date, &analysis("MSFT")).unwrap();
        assert!(store.read("MSFT", date).unwrap().is_some());
        assert!(store.read("AAPL", date).unwrap().is_none());
    }

    #[test]
    fn read_most_recent_searches_backward_through_lookback() {
        let dir = tempdir().unwrap();
        let store = OvernightAnalysisStore::new(dir.path());
        let yesterday = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 7, 29).unwrap();

        store.write(yesterday, &analysis("MSFT")).unwrap();

        let found = store.read_most_recent("MSFT", today, 3).unwrap();
        assert!(found.is_some());

        let not_found = store.read_most_recent("MSFT", today, 0).unwrap();
        assert!(not_found.is_none());
    }
}
