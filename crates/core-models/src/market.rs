use serde::{Deserialize, Serialize};

/// One of the six states `MarketClock` maps a wall-clock instant to.
///
/// `Unknown` is returned when the Broker collaborator cannot confirm market
/// status; callers must treat it as non-trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    ActiveTrading,
    MarketClosing,
    EveningAnalysis,
    OvernightSleep,
    PremarketPrep,
    Unknown,
}

impl MarketState {
    /// Whether new trading activity (order submission) may be initiated in this state.
    pub fn is_tradeable(&self) -> bool {
        matches!(self, MarketState::ActiveTrading)
    }
}

impl std::fmt::Display for MarketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketState::ActiveTrading => "ACTIVE_TRADING",
            MarketState::MarketClosing => "MARKET_CLOSING",
            MarketState::EveningAnalysis => "EVENING_ANALYSIS",
            MarketState::OvernightSleep => "OVERNIGHT_SLEEP",
            MarketState::PremarketPrep => "PREMARKET_PREP",
            MarketState::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_trading_is_tradeable() {
        assert!(MarketState::ActiveTrading.is_tradeable());
        assert!(!MarketState::MarketClosing.is_tradeable());
        assert!(!MarketState::Unknown.is_tradeable());
    }
}
