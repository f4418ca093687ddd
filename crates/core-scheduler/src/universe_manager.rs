//! UniverseManager (component G, spec §4.G): builds a symbol set of size
//! `≤ universe.size` with three priority bands, persisted to a 24-hour cache
//! via `core_store::Store`.

use chrono::Utc;
use core_models::{UniverseEntry, UniverseReason};
use core_store::Store;

use crate::error::SchedulerError;

/// Ten fixed sectors, each contributing up to three leaders to priority-2.
/// A stand-in for a real sector-classification feed: this spec names no
/// collaborator for sector membership, so the table is fixed configuration
/// rather than a discovered universe.
pub const SECTOR_LEADERS: [(&str, [&str; 3]); 10] = [
    ("technology", ["AAPL", "MSFT", "NVDA"]),
    ("financials", ["JPM", "BAC", "GS"]),
    ("healthcare", ["UNH", "JNJ", "LLY"]),
    ("consumer_discretionary", ["AMZN", "HD", "MCD"]),
    ("consumer_staples", ["PG", "KO", "WMT"]),
    ("energy", ["XOM", "CVX", "COP"]),
    ("industrials", ["CAT", "BA", "UPS"]),
    ("utilities", ["NEE", "DUK", "SO"]),
    ("materials", ["LIN", "SHW", "FCX"]),
    ("real_estate", ["PLD", "AMT", "EQIX"]),
];

pub struct UniverseManager<'a> {
    store: &'a Store,
    max_size: usize,
}

impl<'a> UniverseManager<'a> {
    pub fn new(store: &'a Store, universe_size: u32) -> Self {
        Self {
            store,
            max_size: universe_size as usize,
        }
    }

    /// Builds the universe: priority-1 holdings, priority-2 configured
    /// watchlist plus sector leaders, priority-3 discovery candidates,
    /// truncated to `max_size` and persisted to the 24-hour cache.
    pub fn build(
        &self,
        holdings: &[String],
        watchlist: &[String],
        discovery_candidates: &[String],
    ) -> Result<Vec<UniverseEntry>, SchedulerError> {
        let mut entries: Vec<UniverseEntry> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for symbol in holdings {
            if seen.insert(symbol.clone()) {
                entries.push(UniverseEntry::new(symbol.clone(), UniverseReason::Holdings, 1));
            }
        }
        for symbol in watchlist {
            if seen.insert(symbol.clone()) {
                entries.push(UniverseEntry::new(symbol.clone(), UniverseReason::Watchlist, 2));
            }
        }
        for (_, leaders) in SECTOR_LEADERS {
            for symbol in leaders {
                if seen.insert(symbol.to_string()) {
                    entries.push(UniverseEntry::new(symbol, UniverseReason::SectorLeader, 2));
                }
            }
        }
        for symbol in discovery_candidates {
            if seen.insert(symbol.clone()) {
                entries.push(UniverseEntry::new(
                    symbol.clone(),
                    UniverseReason::HighVolume,
                    3,
                ));
            }
        }

        entries.sort_by_key(|e| e.priority);
        entries.truncate(self.max_size);

        self.store.write_universe_cache(&entries)?;
        Ok(entries)
    }

    /// Loads the cached universe if it is younger than `cache_hours`, else
    /// `None` — the caller is then responsible for calling `build` again.
    pub fn cached(&self, cache_hours: u32) -> Result<Option<Vec<UniverseEntry>>, SchedulerError> {
        Ok(self.store.read_universe_cache(cache_hours)?)
    }

    /// Promotes `symbols` into priority-2 for `reason`, re-persisting the
    /// merged set. Symbols already present keep their existing priority if
    /// it is already ≤ 2.
    pub fn promote(
        &self,
        existing: &[UniverseEntry],
        symbols: &[String],
        reason: UniverseReason,
    ) -> Result<Vec<UniverseEntry>, SchedulerError> {
        let mut merged: Vec<UniverseEntry> = existing.to_vec();
        for symbol in symbols {
            if let Some(entry) = merged.iter_mut().find(|e| &e.symbol == symbol) {
                if entry.priority > 2 {
                    entry.priority = 2;
                    entry.reason = reason;
                    entry.added_at = Utc::now();
                }
            } else {
                merged.push(UniverseEntry::new(symbol.clone(), reason, 2));
            }
        }
        merged.sort_by_key(|e| e.priority);
        merged.truncate(self.max_size);
        self.store.write_universe_cache(&merged)?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn holdings_always_rank_priority_one() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let manager = UniverseManager::new(&store, 100);

        let entries = manager
            .build(&["AAPL".to_string()], &["TSLA".to_string()], &[])
            .unwrap();

        let aapl = entries.iter().find(|e| e.symbol == "AAPL").unwrap();
        assert_eq!(aapl.priority, 1);
        assert_eq!(aapl.reason, UniverseReason::Holdings);
    }

    #[test]
    fn truncates_to_configured_size() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let manager = UniverseManager::new(&store, 5);

        let entries = manager.build(&[], &[], &[]).unwrap();
        assert!(entries.len() <= 5);
    }

    #[test]
    fn promote_moves_priority_three_symbol_to_priority_two() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let manager = UniverseManager::new(&store, 100);

        let entries = manager
            .build(&[], &[], &["OBSCURE".to_string()])
            .unwrap();
        let promoted = manager
            .promote(&entries, &["OBSCURE".to_string()], UniverseReason::NewsPromoted)
            .unwrap();

        let obscure = promoted.iter().find(|e| e.symbol == "OBSCURE").unwrap();
        assert_eq!(obscure.priority, 2);
        assert_eq!(obscure.reason, UniverseReason::NewsPromoted);
    }

    #[test]
    fn cached_returns_none_when_no_cache_written() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let manager = UniverseManager::new(&store, 100);
        assert!(manager.cached(24).unwrap().is_none());
    }
}
