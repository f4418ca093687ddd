use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseReason {
    Holdings,
    Watchlist,
    SectorLeader,
    HighVolume,
    RecentMover,
    NewsPromoted,
}

/// A tracked symbol with its priority band. Priority-1 entries are always
/// included; priority-2 next; priority-3 fills to the configured cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub reason: UniverseReason,
    pub priority: u8,
    pub added_at: DateTime<Utc>,
}

impl UniverseEntry {
    pub fn new(symbol: impl Into<String>, reason: UniverseReason, priority: u8) -> Self {
        Self {
            symbol: symbol.into(),
            reason,
            priority,
            added_at: Utc::now(),
        }
    }
}
