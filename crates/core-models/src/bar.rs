use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Timestamped OHLCV tuple for one symbol at one timeframe.
///
/// Immutable; produced by the Broker collaborator. Not persisted by the
/// Decision Core — bars are short-lived in memory for the duration of a
/// `IndicatorEngine` computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timeframe: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// A trend/momentum/volatility/volume label. Accompanies every numeric
/// indicator field shown to the model so raw numbers never cross the
/// PromptAssembler boundary unlabeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumSignal {
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSignal {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    NearUpper,
    NearLower,
    Middle,
}

/// Derived enumerated summary of an `IndicatorSet`, used by the
/// PromptAssembler so the model is never shown raw numbers without an
/// accompanying label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalBlock {
    pub momentum: MomentumSignal,
    pub trend: TrendSignal,
    pub band_position: BandPosition,
    pub composite: TrendSignal,
}

impl SignalBlock {
    pub fn neutral() -> Self {
        Self {
            momentum: MomentumSignal::Neutral,
            trend: TrendSignal::Neutral,
            band_position: BandPosition::Middle,
            composite: TrendSignal::Neutral,
        }
    }
}

/// Derived numeric snapshot over a fixed-length OHLCV window.
///
/// All fields are numbers or explicitly absent (`None`); no sentinel NaN
/// crosses this boundary. Windowed indicators are `None` for the first
/// `window - 1` positions of their own lookback, and the whole set collapses
/// to all-absent-with-neutral-signals when the input window is shorter than
/// 50 bars (see `IndicatorError::InsufficientData`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub symbol: String,

    // Price block
    pub close: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,

    // Trend
    pub sma_20: Option<Decimal>,
    pub sma_50: Option<Decimal>,
    pub ema_12: Option<Decimal>,
    pub ema_26: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub macd_histogram: Option<Decimal>,

    // Momentum
    pub rsi_14: Option<Decimal>,

    // Volatility
    pub bollinger_upper: Option<Decimal>,
    pub bollinger_mid: Option<Decimal>,
    pub bollinger_lower: Option<Decimal>,
    pub atr_14: Option<Decimal>,
    pub stdev: Option<Decimal>,
    pub historical_volatility: Option<Decimal>,

    // Volume
    pub volume_sma_20: Option<Decimal>,
    pub volume_ratio: Option<Decimal>,
    pub obv: Option<Decimal>,

    // Derived
    pub support: Option<Decimal>,
    pub resistance: Option<Decimal>,

    pub signals: SignalBlock,
}

impl IndicatorSet {
    /// An all-absent set with neutral signals, used when the lookback window
    /// is too short to compute anything (`< 50` bars) or the symbol has no
    /// cached bars yet.
    pub fn insufficient_data(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            close: None,
            high: None,
            low: None,
            sma_20: None,
            sma_50: None,
            ema_12: None,
            ema_26: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            rsi_14: None,
            bollinger_upper: None,
            bollinger_mid: None,
            bollinger_lower: None,
            atr_14: None,
            stdev: None,
            historical_volatility: None,
            volume_sma_20: None,
            volume_ratio: None,
            obv: None,
            support: None,
            resistance: None,
            signals: SignalBlock::neutral(),
        }
    }
}
