//! Vectorized technical-indicator computation over a fixed-length OHLCV
//! window (component B). Pure function: no I/O, no collaborators. Every
//! windowed figure is computed over the whole supplied slice and reported
//! absent rather than zero when the window is too short for it.

mod error;

pub use error::IndicatorError;

use core_models::{Bar, BandPosition, IndicatorSet, MomentumSignal, SignalBlock, TrendSignal};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_ti::standard_indicators::bulk as sti;
use rust_ti::{ConstantModelType, DeviationModel};

/// Below this many bars the window can't support the slowest indicator
/// (SMA-50), so the whole snapshot is reported as `InsufficientData`.
const MIN_BARS: usize = 50;
const BOLLINGER_PERIOD: usize = 20;
const ATR_PERIOD: usize = 14;
const VOLUME_SMA_PERIOD: usize = 20;
const SUPPORT_RESISTANCE_LOOKBACK: usize = 20;

/// Computes the full indicator snapshot for the most recent bar in `bars`.
/// `bars` must be in ascending timestamp order for a single symbol.
pub fn compute_indicators(symbol: &str, bars: &[Bar]) -> Result<IndicatorSet, IndicatorError> {
    if bars.len() < MIN_BARS {
        return Err(IndicatorError::InsufficientData {
            required: MIN_BARS,
            available: bars.len(),
        });
    }

    let closes: Vec<f64> = bars.iter().filter_map(|b| b.close.to_f64()).collect();
    let highs: Vec<f64> = bars.iter().filter_map(|b| b.high.to_f64()).collect();
    let lows: Vec<f64> = bars.iter().filter_map(|b| b.low.to_f64()).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

    let close = bars.last().expect("checked non-empty above").close;
    let high = bars.last().expect("checked non-empty above").high;
    let low = bars.last().expect("checked non-empty above").low;

    let sma_20 = sti::simple_moving_average(&closes, 20).last().copied();
    let sma_50 = sti::simple_moving_average(&closes, 50).last().copied();
    let ema_12 = sti::exponential_moving_average(&closes, 12).last().copied();
    let ema_26 = sti::exponential_moving_average(&closes, 26).last().copied();

    let rsi_14 = sti::rsi(&closes).last().copied();

    let macd_values = sti::macd(&closes);
    let (macd, macd_signal, macd_histogram) = macd_values
        .last()
        .map(|(m, s, h)| (Some(*m), Some(*s), Some(*h)))
        .unwrap_or((None, None, None));

    let bands = rust_ti::candle_indicators::bulk::moving_constant_bands(
        &closes,
        ConstantModelType::SimpleMovingAverage,
        DeviationModel::StandardDeviation,
        2.0,
        BOLLINGER_PERIOD,
    );
    let (bollinger_lower, bollinger_mid, bollinger_upper) = bands
        .last()
        .map(|(lo, mid, hi)| (Some(*lo), Some(*mid), Some(*hi)))
        .unwrap_or((None, None, None));
    let stdev = match (bollinger_upper, bollinger_mid) {
        (Some(u), Some(m)) => Some((u - m) / 2.0),
        _ => None,
    };

    // Wilder's smoothing isn't exposed by rust_ti's ConstantModelType; of its
    // two moving-average variants, the exponential one weights recent true
    // ranges more heavily, same as Wilder's mean does, so it's the closer
    // approximation of the two.
    let atr_14 = if closes.len() >= ATR_PERIOD {
        let start = closes.len() - ATR_PERIOD;
        Some(rust_ti::other_indicators::single::average_true_range(
            &closes[start..],
            &highs[start..],
            &lows[start..],
            ConstantModelType::ExponentialMovingAverage,
        ))
    } else {
        None
    };

    let historical_volatility = historical_volatility(&closes, BOLLINGER_PERIOD);

    let volume_sma_20 = sti::simple_moving_average(&volumes, VOLUME_SMA_PERIOD)
        .last()
        .copied();
    let volume_ratio = match (volumes.last(), volume_sma_20) {
        (Some(&current), Some(avg)) if avg > 0.0 => Some(current / avg),
        _ => None,
    };
    let obv = on_balance_volume(&closes, &volumes);

    let support = lows
        .iter()
        .rev()
        .take(SUPPORT_RESISTANCE_LOOKBACK)
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let resistance = highs
        .iter()
        .rev()
        .take(SUPPORT_RESISTANCE_LOOKBACK)
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    let momentum = match rsi_14 {
        Some(v) if v >= 70.0 => MomentumSignal::Overbought,
        Some(v) if v <= 30.0 => MomentumSignal::Oversold,
        _ => MomentumSignal::Neutral,
    };
    let trend = match (ema_12, ema_26) {
        (Some(fast), Some(slow)) if fast > slow => TrendSignal::Bullish,
        (Some(fast), Some(slow)) if fast < slow => TrendSignal::Bearish,
        _ => TrendSignal::Neutral,
    };
    let band_position = match (bollinger_upper, bollinger_lower) {
        (Some(u), _) if closes.last().is_some_and(|&c| c >= u) => BandPosition::NearUpper,
        (_, Some(l)) if closes.last().is_some_and(|&c| c <= l) => BandPosition::NearLower,
        _ => BandPosition::Middle,
    };
    let composite = match (trend, momentum) {
        (TrendSignal::Bullish, MomentumSignal::Overbought) => TrendSignal::Neutral,
        (TrendSignal::Bearish, MomentumSignal::Oversold) => TrendSignal::Neutral,
        (TrendSignal::Bullish, _) => TrendSignal::Bullish,
        (TrendSignal::Bearish, _) => TrendSignal::Bearish,
        (TrendSignal::Neutral, _) => TrendSignal::Neutral,
    };

    Ok(IndicatorSet {
        symbol: symbol.to_string(),
        close: Some(close),
        high: Some(high),
        low: Some(low),
        sma_20: sma_20.and_then(decimal_from_f64),
        sma_50: sma_50.and_then(decimal_from_f64),
        ema_12: ema_12.and_then(decimal_from_f64),
        ema_26: ema_26.and_then(decimal_from_f64),
        macd: macd.and_then(decimal_from_f64),
        macd_signal: macd_signal.and_then(decimal_from_f64),
        macd_histogram: macd_histogram.and_then(decimal_from_f64),
        rsi_14: rsi_14.and_then(decimal_from_f64),
        bollinger_upper: bollinger_upper.and_then(decimal_from_f64),
        bollinger_mid: bollinger_mid.and_then(decimal_from_f64),
        bollinger_lower: bollinger_lower.and_then(decimal_from_f64),
        atr_14: atr_14.and_then(decimal_from_f64),
        stdev: stdev.and_then(decimal_from_f64),
        historical_volatility: historical_volatility.and_then(decimal_from_f64),
        volume_sma_20: volume_sma_20.and_then(decimal_from_f64),
        volume_ratio: volume_ratio.and_then(decimal_from_f64),
        obv: obv.and_then(decimal_from_f64),
        support: decimal_from_f64(support),
        resistance: decimal_from_f64(resistance),
        signals: SignalBlock {
            momentum,
            trend,
            band_position,
            composite,
        },
    })
}

fn on_balance_volume(closes: &[f64], volumes: &[f64]) -> Option<f64> {
    if closes.len() != volumes.len() || closes.is_empty() {
        return None;
    }
    let mut obv = 0.0;
    for i in 1..closes.len() {
        if closes[i] > closes[i - 1] {
            obv += volumes[i];
        } else if closes[i] < closes[i - 1] {
            obv -= volumes[i];
        }
    }
    Some(obv)
}

fn historical_volatility(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 {
        return None;
    }
    let window = &closes[closes.len() - period - 1..];
    let log_returns: Vec<f64> = window
        .windows(2)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect();
    let mean = log_returns.iter().sum::<f64>() / log_returns.len() as f64;
    let variance = log_returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / log_returns.len() as f64;
    Some(variance.sqrt() * 252f64.sqrt())
}

fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::from_f64(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn make_bars(n: usize, start_price: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let price = start_price + i as f64 * 0.5;
                Bar {
                    symbol: "ACME".to_string(),
                    timeframe: "1d".to_string(),
                    timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap(),
                    open: Decimal::from_f64(price).unwrap(),
                    high: Decimal::from_f64(price + 1.0).unwrap(),
                    low: Decimal::from_f64(price - 1.0).unwrap(),
                    close: Decimal::from_f64(price + 0.2).unwrap(),
                    volume: 1_000_000 + i as u64 * 100,
                }
            })
            .collect()
    }

    #[test]
    fn insufficient_data_below_fifty_bars() {
        let bars = make_bars(10, 100.0);
        let err = compute_indicators("ACME", &bars).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                required: 50,
                available: 10
            }
        );
    }

    #[test]
    fn sufficient_data_produces_all_fields() {
        let bars = make_bars(60, 100.0);
        let set = compute_indicators("ACME", &bars).unwrap();
        assert!(set.sma_20.is_some());
        assert!(set.sma_50.is_some());
        assert!(set.rsi_14.is_some());
        assert!(set.macd.is_some());
        assert!(set.bollinger_upper.is_some());
        assert!(set.atr_14.is_some());
        assert!(set.obv.is_some());
        // Steadily rising prices: trend should read bullish, not bearish.
        assert_eq!(set.signals.trend, TrendSignal::Bullish);
    }

    #[test]
    fn flat_prices_have_zero_volatility_bands() {
        let mut bars = make_bars(60, 100.0);
        for bar in &mut bars {
            bar.open = dec!(100);
            bar.high = dec!(100);
            bar.low = dec!(100);
            bar.close = dec!(100);
        }
        let set = compute_indicators("ACME", &bars).unwrap();
        assert_eq!(set.stdev, Some(Decimal::ZERO));
        assert_eq!(set.signals.momentum, MomentumSignal::Neutral);
    }

    #[test]
    fn sma_requires_full_window() {
        assert!(sti::simple_moving_average(&[1.0, 2.0], 3).is_empty());
        assert_eq!(
            sti::simple_moving_average(&[1.0, 2.0, 3.0], 3).last().copied(),
            Some(2.0)
        );
    }
}
