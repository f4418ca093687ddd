use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-zero holding in one symbol. Owned by TradingAgent; refreshed at
/// cycle start from the Broker collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed quantity; negative denotes a short, which this system does not
    /// originate but may observe if externally opened.
    pub qty: Decimal,
    pub avg_entry_price: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl_abs: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub days_held: u32,
}

impl Position {
    pub fn is_held(&self) -> bool {
        !self.qty.is_zero()
    }
}

/// Account snapshot regenerated each TradingAgent cycle. Never persisted as
/// authoritative — the Broker collaborator is the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub equity: Decimal,
    pub cash: Decimal,
    pub buying_power: Decimal,
    pub daytime_trades_used: u32,
    pub positions: Vec<Position>,
    pub timestamp: DateTime<Utc>,
}

impl AccountState {
    pub fn position_for(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    pub fn holds(&self, symbol: &str) -> bool {
        self.position_for(symbol).is_some_and(Position::is_held)
    }

    /// `buying_power / equity`, used to derive the `CAPITAL_CONSTRAINT` trigger.
    pub fn buying_power_ratio(&self) -> Decimal {
        if self.equity.is_zero() {
            Decimal::ZERO
        } else {
            self.buying_power / self.equity
        }
    }

    /// `sum(|position.market_value|) / equity`, the portfolio exposure ratio
    /// RiskGate compares against `max_portfolio_exposure_pct`.
    pub fn exposure_ratio(&self) -> Decimal {
        if self.equity.is_zero() {
            return Decimal::ZERO;
        }
        let total: Decimal = self.positions.iter().map(|p| p.market_value.abs()).sum();
        total / self.equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, qty: Decimal, market_value: Decimal) -> Position {
        Position {
            symbol: symbol.to_string(),
            qty,
            avg_entry_price: dec!(100),
            current_price: dec!(100),
            market_value,
            unrealized_pnl_abs: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            days_held: 1,
        }
    }

    #[test]
    fn exposure_ratio_sums_absolute_market_values() {
        let state = AccountState {
            equity: dec!(100000),
            cash: dec!(50000),
            buying_power: dec!(50000),
            daytime_trades_used: 0,
            positions: vec![
                position("AAPL", dec!(100), dec!(60000)),
                position("MSFT", dec!(-50), dec!(-40000)),
            ],
            timestamp: Utc::now(),
        };
        assert_eq!(state.exposure_ratio(), dec!(1));
    }

    #[test]
    fn buying_power_ratio_detects_capital_constraint() {
        let state = AccountState {
            equity: dec!(100000),
            cash: dec!(600),
            buying_power: dec!(600),
            daytime_trades_used: 0,
            positions: vec![],
            timestamp: Utc::now(),
        };
        assert!(state.buying_power_ratio() < dec!(0.05));
    }
}
