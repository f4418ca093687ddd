//! RiskGate (component E): a hard-coded, LLM-independent series of checks
//! gating every proposed action before it reaches the Broker (spec §4.E).
//! Grounded on the sequential filter-chain style of
//! `Zuytan-rustrade`'s `process_bullish_news` — each check either
//! short-circuits with a rejection or falls through to the next.

use core_models::{Action, AccountState, MarketState, RiskConfig, RiskResult, TradingProfile};
use rust_decimal::Decimal;

/// A trade being evaluated: enough of a Decision's shape to gate it without
/// requiring the full parsed-and-persisted `Decision`.
pub struct ProposedTrade<'a> {
    pub symbol: &'a str,
    pub action: Action,
    pub confidence: i32,
    pub notional: Decimal,
}

pub struct RiskGate {
    config: RiskConfig,
    profile: TradingProfile,
}

impl RiskGate {
    pub fn new(config: RiskConfig, profile: TradingProfile) -> Self {
        Self { config, profile }
    }

    /// Runs the seven ordered checks against `account` as of `market_state`
    /// and `trades_executed_today`. Never mutates state; the caller records
    /// the outcome.
    pub fn evaluate(
        &self,
        trade: &ProposedTrade<'_>,
        account: &AccountState,
        market_state: MarketState,
        trades_executed_today: u32,
        daily_drawdown_pct: Decimal,
    ) -> RiskResult {
        if trade.action == Action::Hold {
            return RiskResult::approve("hold never reaches RiskGate");
        }

        if let Some(rejection) = self.check_confidence(trade) {
            return rejection;
        }
        if let Some(rejection) = self.check_action_type(trade, market_state) {
            return rejection;
        }
        if let Some(rejection) = self.check_position_size(trade, account) {
            return rejection;
        }
        if let Some(rejection) = self.check_buying_power(trade, account) {
            return rejection;
        }
        if let Some(result) = self.check_portfolio_exposure(trade, account) {
            return result;
        }
        if let Some(rejection) = self.check_daily_loss_limit(trade, daily_drawdown_pct) {
            return rejection;
        }
        if let Some(rejection) = self.check_trade_frequency(trades_executed_today) {
            return rejection;
        }

        RiskResult::approve("all checks passed")
    }

    fn check_confidence(&self, trade: &ProposedTrade<'_>) -> Option<RiskResult> {
        let thresholds = self.profile.thresholds();
        let min_confidence = match trade.action {
            Action::Buy => thresholds.min_buy_confidence,
            Action::Sell => thresholds.min_sell_confidence,
            Action::Hold => return None,
        };
        if trade.confidence < min_confidence {
            return Some(RiskResult::reject(format!(
                "confidence {} below {:?} {} threshold {min_confidence}",
                trade.confidence, self.profile, trade.action_label()
            )));
        }
        None
    }

    fn check_action_type(
        &self,
        trade: &ProposedTrade<'_>,
        market_state: MarketState,
    ) -> Option<RiskResult> {
        let allowed = match trade.action {
            Action::Buy => market_state == MarketState::ActiveTrading,
            Action::Sell => matches!(
                market_state,
                MarketState::ActiveTrading | MarketState::MarketClosing
            ),
            Action::Hold => true,
        };
        if !allowed {
            return Some(RiskResult::reject(format!(
                "{} not permitted during {market_state}",
                trade.action_label()
            )));
        }
        None
    }

    fn check_position_size(
        &self,
        trade: &ProposedTrade<'_>,
        account: &AccountState,
    ) -> Option<RiskResult> {
        let cap = account.equity * Decimal::from(self.config.max_position_size_pct) / Decimal::ONE_HUNDRED;
        if trade.notional > cap {
            return Some(RiskResult::reject(format!(
                "proposed notional {} exceeds position size cap {cap} ({}% of equity)",
                trade.notional, self.config.max_position_size_pct
            )));
        }
        None
    }

    fn check_buying_power(
        &self,
        trade: &ProposedTrade<'_>,
        account: &AccountState,
    ) -> Option<RiskResult> {
        if trade.action == Action::Buy && trade.notional > account.buying_power {
            return Some(RiskResult::reject(format!(
                "proposed notional {} exceeds buying power {}",
                trade.notional, account.buying_power
            )));
        }
        None
    }

    /// Asymmetric per spec §4.E step 5 / Open Question (c): a buy that would
    /// push exposure over the cap is rejected; a sell over the cap is
    /// approved with a warning, since selling can only reduce exposure.
    fn check_portfolio_exposure(
        &self,
        trade: &ProposedTrade<'_>,
        account: &AccountState,
    ) -> Option<RiskResult> {
        let cap = Decimal::from(self.config.max_portfolio_exposure_pct) / Decimal::ONE_HUNDRED;
        let projected = account.exposure_ratio() + trade.notional / account.equity.max(Decimal::ONE);

        if projected <= cap {
            return None;
        }

        match trade.action {
            Action::Buy => Some(RiskResult::reject(format!(
                "projected exposure {projected} exceeds cap {cap}"
            ))),
            Action::Sell => Some(RiskResult::approve_with_warning(
                "exposure over cap but sell reduces it",
                format!("portfolio exposure {projected} exceeds cap {cap}"),
            )),
            Action::Hold => None,
        }
    }

    fn check_daily_loss_limit(
        &self,
        trade: &ProposedTrade<'_>,
        daily_drawdown_pct: Decimal,
    ) -> Option<RiskResult> {
        let limit = Decimal::from(self.config.max_daily_loss_pct);
        if trade.action == Action::Buy && daily_drawdown_pct >= limit {
            return Some(RiskResult::reject(format!(
                "daily drawdown {daily_drawdown_pct}% at or beyond limit {limit}%, buys halted"
            )));
        }
        None
    }

    fn check_trade_frequency(&self, trades_executed_today: u32) -> Option<RiskResult> {
        if trades_executed_today >= self.config.max_trades_per_day {
            return Some(RiskResult::reject(format!(
                "{trades_executed_today} trades already executed today, at limit {}",
                self.config.max_trades_per_day
            )));
        }
        None
    }
}

impl ProposedTrade<'_> {
    fn action_label(&self) -> &'static str {
        match self.action {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Hold => "hold",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_models::Position;
    use rust_decimal_macros::dec;

    fn account(equity: Decimal, buying_power: Decimal, positions: Vec<Position>) -> AccountState {
        AccountState {
            equity,
            cash: buying_power,
            buying_power,
            daytime_trades_used: 0,
            positions,
            timestamp: Utc::now(),
        }
    }

    fn gate() -> RiskGate {
        RiskGate::new(RiskConfig::default(), TradingProfile::Moderate)
    }

    #[test]
    fn hold_never_reaches_checks() {
        let trade = ProposedTrade {
            symbol: "AAPL",
            action: Action::Hold,
            confidence: 0,
            notional: Decimal::ZERO,
        };
        let result = gate().evaluate(
            &trade,
            &account(dec!(100000), dec!(50000), vec![]),
            MarketState::Unknown,
            0,
            Decimal::ZERO,
        );
        assert!(result.approved);
    }

    #[test]
    fn buy_rejected_below_confidence_threshold() {
        let trade = ProposedTrade {
            symbol: "AAPL",
            action: Action::Buy,
            confidence: 50,
            notional: dec!(1000),
        };
        let result = gate().evaluate(
            &trade,
            &account(dec!(100000), dec!(50000), vec![]),
            MarketState::ActiveTrading,
            0,
            Decimal::ZERO,
        );
        assert!(!result.approved);
    }

    #[test]
    fn buy_rejected_outside_active_trading() {
        let trade = ProposedTrade {
            symbol: "AAPL",
            action: Action::Buy,
            confidence: 90,
            notional: dec!(1000),
        };
        let result = gate().evaluate(
            &trade,
            &account(dec!(100000), dec!(50000), vec![]),
            MarketState::MarketClosing,
            0,
            Decimal::ZERO,
        );
        assert!(!result.approved);
    }

    #[test]
    fn sell_allowed_during_market_closing() {
        let trade = ProposedTrade {
            symbol: "AAPL",
            action: Action::Sell,
            confidence: 90,
            notional: dec!(1000),
        };
        let result = gate().evaluate(
            &trade,
            &account(dec!(100000), dec!(50000), vec![]),
            MarketState::MarketClosing,
            0,
            Decimal::ZERO,
        );
        assert!(result.approved);
    }

    #[test]
    fn buy_rejected_over_position_size_cap() {
        let trade = ProposedTrade {
            symbol: "AAPL",
            action: Action::Buy,
            confidence: 90,
            notional: dec!(20000),
        };
        let result = gate().evaluate(
            &trade,
            &account(dec!(100000), dec!(50000), vec![]),
            MarketState::ActiveTrading,
            0,
            Decimal::ZERO,
        );
        assert!(!result.approved);
    }

    #[test]
    fn buy_rejected_over_buying_power() {
        let trade = ProposedTrade {
            symbol: "AAPL",
            action: Action::Buy,
            confidence: 90,
            notional: dec!(9000),
        };
        let result = gate().evaluate(
            &trade,
            &account(dec!(100000), dec!(5000), vec![]),
            MarketState::ActiveTrading,
            0,
            Decimal::ZERO,
        );
        assert!(!result.approved);
    }

    #[test]
    fn buy_rejected_over_exposure_cap_sell_approved_with_warning() {
        let position = Position {
            symbol: "MSFT".to_string(),
            qty: dec!(1000),
            avg_entry_price: dec!(140),
            current_price: dec!(160),
            market_value: dec!(160000),
            unrealized_pnl_abs: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            days_held: 5,
        };
        let acc = account(dec!(100000), dec!(5000), vec![position]);

        let buy = ProposedTrade {
            symbol: "AAPL",
            action: Action::Buy,
            confidence: 90,
            notional: dec!(5000),
        };
        let buy_result = gate().evaluate(&buy, &acc, MarketState::ActiveTrading, 0, Decimal::ZERO);
        assert!(!buy_result.approved);

        let sell = ProposedTrade {
            symbol: "MSFT",
            action: Action::Sell,
            confidence: 90,
            notional: dec!(5000),
        };
        let sell_result = gate().evaluate(&sell, &acc, MarketState::ActiveTrading, 0, Decimal::ZERO);
        assert!(sell_result.approved);
        assert!(!sell_result.warnings.is_empty());
    }

    #[test]
    fn daily_loss_limit_halts_buys_not_sells() {
        let acc = account(dec!(100000), dec!(50000), vec![]);

        let buy = ProposedTrade {
            symbol: "AAPL",
            action: Action::Buy,
            confidence: 90,
            notional: dec!(1000),
        };
        let buy_result = gate().evaluate(&buy, &acc, MarketState::ActiveTrading, 0, dec!(3));
        assert!(!buy_result.approved);

        let sell = ProposedTrade {
            symbol: "AAPL",
            action: Action::Sell,
            confidence: 90,
            notional: dec!(1000),
        };
        let sell_result = gate().evaluate(&sell, &acc, MarketState::ActiveTrading, 0, dec!(3));
        assert!(sell_result.approved);
    }

    #[test]
    fn trade_frequency_limit_rejects_both_sides() {
        let acc = account(dec!(100000), dec!(50000), vec![]);
        let sell = ProposedTrade {
            symbol: "AAPL",
            action: Action::Sell,
            confidence: 90,
            notional: dec!(1000),
        };
        let result = gate().evaluate(&sell, &acc, MarketState::ActiveTrading, 10, Decimal::ZERO);
        assert!(!result.approved);
    }
}
