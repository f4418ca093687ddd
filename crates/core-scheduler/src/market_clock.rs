//! MarketClock (component A, spec §4.A): maps a wall-clock instant in a
//! fixed market timezone to one of six states. The open/closed truth comes
//! from the Broker when reachable; when the Broker is unreachable this
//! returns `Unknown`, which callers MUST treat as non-trading.

use chrono::{Datelike, Duration, NaiveTime, TimeZone, Timelike, Weekday};
use chrono_tz::Tz;
use core_models::MarketState;
use core_prompting::Broker;
use std::sync::Arc;

const ACTIVE_TRADING_START: (u32, u32) = (9, 30);
const MARKET_CLOSING_START: (u32, u32) = (15, 30);
const EVENING_ANALYSIS_START: (u32, u32) = (16, 30);
const OVERNIGHT_SLEEP_START: (u32, u32) = (22, 0);
const PREMARKET_PREP_START: (u32, u32) = (6, 0);

fn time_of(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("static hh:mm is always valid")
}

/// Maps wall-clock instants to trading states. Cheap to construct; holds
/// only the configured timezone and an optional Broker for the open/closed
/// probe described in spec §4.A.
pub struct MarketClock {
    timezone: Tz,
    broker: Option<Arc<dyn Broker>>,
}

impl MarketClock {
    pub fn new(timezone: Tz, broker: Option<Arc<dyn Broker>>) -> Self {
        Self { timezone, broker }
    }

    /// The calendar-only state: weekday/time-of-day bucket, ignoring
    /// holidays (the Broker probe is the source of truth for those —
    /// `now_state` collapses to `Unknown` rather than guess at a holiday
    /// calendar this spec does not define).
    fn calendar_state(&self, now: chrono::DateTime<Utc>) -> MarketState {
        let local = self.timezone.from_utc_datetime(&now.naive_utc());
        let is_weekend = matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
        let t = local.time();

        if is_weekend {
            return if t >= time_of(OVERNIGHT_SLEEP_START.0, OVERNIGHT_SLEEP_START.1)
                || t < time_of(PREMARKET_PREP_START.0, PREMARKET_PREP_START.1)
            {
                MarketState::OvernightSleep
            } else {
                MarketState::PremarketPrep
            };
        }

        if t >= time_of(ACTIVE_TRADING_START.0, ACTIVE_TRADING_START.1)
            && t < time_of(MARKET_CLOSING_START.0, MARKET_CLOSING_START.1)
        {
            MarketState::ActiveTrading
        } else if t >= time_of(MARKET_CLOSING_START.0, MARKET_CLOSING_START.1)
            && t < time_of(EVENING_ANALYSIS_START.0, EVENING_ANALYSIS_START.1)
        {
            MarketState::MarketClosing
        } else if t >= time_of(EVENING_ANALYSIS_START.0, EVENING_ANALYSIS_START.1)
            && t < time_of(OVERNIGHT_SLEEP_START.0, OVERNIGHT_SLEEP_START.1)
        {
            MarketState::EveningAnalysis
        } else if t >= time_of(OVERNIGHT_SLEEP_START.0, OVERNIGHT_SLEEP_START.1)
            || t < time_of(PREMARKET_PREP_START.0, PREMARKET_PREP_START.1)
        {
            MarketState::OvernightSleep
        } else {
            MarketState::PremarketPrep
        }
    }

    /// Current state. The calendar bucket (time-of-day in the configured
    /// timezone) is always the basis for which of the six states applies;
    /// the Broker is only consulted as a reachability probe — a probe
    /// failure collapses the whole result to `Unknown` per spec §4.A,
    /// since MarketClock has no independent holiday calendar to fall back
    /// on and must not guess.
    pub async fn now_state(&self, now: chrono::DateTime<Utc>) -> MarketState {
        if let Some(broker) = &self.broker {
            if broker.get_market_status().await.is_err() {
                return MarketState::Unknown;
            }
        }
        self.calendar_state(now)
    }

    /// Time remaining until `now` crosses into `target`, assuming `target`
    /// is reached later the same or next calendar day in the configured
    /// timezone.
    pub fn time_until(&self, now: chrono::DateTime<Utc>, target: MarketState) -> Duration {
        let local = self.timezone.from_utc_datetime(&now.naive_utc());
        let boundary_time = match target {
            MarketState::ActiveTrading => time_of(ACTIVE_TRADING_START.0, ACTIVE_TRADING_START.1),
            MarketState::MarketClosing => time_of(MARKET_CLOSING_START.0, MARKET_CLOSING_START.1),
            MarketState::EveningAnalysis => {
                time_of(EVENING_ANALYSIS_START.0, EVENING_ANALYSIS_START.1)
            }
            MarketState::OvernightSleep => {
                time_of(OVERNIGHT_SLEEP_START.0, OVERNIGHT_SLEEP_START.1)
            }
            MarketState::PremarketPrep => {
                time_of(PREMARKET_PREP_START.0, PREMARKET_PREP_START.1)
            }
            MarketState::Unknown => return Duration::zero(),
        };

        let mut candidate = local
            .date_naive()
            .and_time(boundary_time);
        if candidate <= local.naive_local() {
            candidate += Duration::days(1);
        }
        candidate - local.naive_local()
    }

    pub async fn is_tradeable(&self, now: chrono::DateTime<Utc>) -> bool {
        self.now_state(now).await.is_tradeable()
    }
}

use chrono::Utc;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn ny() -> Tz {
        "America/New_York".parse().unwrap()
    }

    fn utc_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[tokio::test]
    async fn weekday_930am_eastern_is_active_trading() {
        let clock = MarketClock::new(ny(), None);
        // 14:30 UTC is 09:30 ET during EDT (summer).
        let state = clock.calendar_state(utc_at(2026, 7, 29, 13, 30));
        assert_eq!(state, MarketState::ActiveTrading);
    }

    #[tokio::test]
    async fn weekday_midnight_is_overnight_sleep() {
        let clock = MarketClock::new(ny(), None);
        let state = clock.calendar_state(utc_at(2026, 7, 29, 5, 0));
        assert_eq!(state, MarketState::OvernightSleep);
    }

    #[tokio::test]
    async fn saturday_morning_is_premarket_prep_bucket() {
        let clock = MarketClock::new(ny(), None);
        // 2026-08-01 is a Saturday.
        let state = clock.calendar_state(utc_at(2026, 8, 1, 14, 0));
        assert_eq!(state, MarketState::PremarketPrep);
    }

    #[tokio::test]
    async fn no_broker_falls_back_to_calendar_state() {
        let clock = MarketClock::new(ny(), None);
        let state = clock.now_state(utc_at(2026, 7, 29, 13, 30)).await;
        assert_eq!(state, MarketState::ActiveTrading);
    }
}
