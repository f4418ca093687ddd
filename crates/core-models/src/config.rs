use serde::{Deserialize, Serialize};

use crate::query_context::TradingProfile;

/// Top-level configuration, loaded once at startup from environment and a
/// settings document and passed by value into constructors (spec §9:
/// "global singletons → injected collaborators" applies to configuration
/// too — it is read-only after startup, never a lazily-initialized global).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

fn default_max_position_size_pct() -> i32 {
    10
}
fn default_max_daily_loss_pct() -> i32 {
    2
}
fn default_max_portfolio_exposure_pct() -> i32 {
    150
}
fn default_max_trades_per_day() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskConfig {
    #[serde(default = "default_max_position_size_pct")]
    pub max_position_size_pct: i32,
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: i32,
    /// Advisory for sells: exceeding this caps new buys but a sell that
    /// reduces exposure is approved with a warning instead of rejected.
    #[serde(default = "default_max_portfolio_exposure_pct")]
    pub max_portfolio_exposure_pct: i32,
    #[serde(default = "default_max_trades_per_day")]
    pub max_trades_per_day: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size_pct: default_max_position_size_pct(),
            max_daily_loss_pct: default_max_daily_loss_pct(),
            max_portfolio_exposure_pct: default_max_portfolio_exposure_pct(),
            max_trades_per_day: default_max_trades_per_day(),
        }
    }
}

fn default_profile() -> TradingProfile {
    TradingProfile::Moderate
}
fn default_cycle_interval_minutes() -> u32 {
    5
}
fn default_dry_run() -> bool {
    false
}
fn default_new_opportunity_budget() -> u32 {
    10
}
fn default_fill_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingConfig {
    #[serde(default = "default_profile")]
    pub profile: TradingProfile,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default = "default_cycle_interval_minutes")]
    pub cycle_interval_minutes: u32,
    /// When true, orders are recorded but never submitted to the Broker.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Maximum NEW_OPPORTUNITY evaluations per cycle once holdings are reviewed.
    #[serde(default = "default_new_opportunity_budget")]
    pub new_opportunity_budget: u32,
    /// How long to wait for a submitted market order to fill before recording
    /// `fill_timeout` and moving on (spec §4.J order submission contract).
    #[serde(default = "default_fill_timeout_seconds")]
    pub fill_timeout_seconds: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            symbols: Vec::new(),
            cycle_interval_minutes: default_cycle_interval_minutes(),
            dry_run: default_dry_run(),
            new_opportunity_budget: default_new_opportunity_budget(),
            fill_timeout_seconds: default_fill_timeout_seconds(),
        }
    }
}

fn default_temperature() -> f64 {
    0.2
}
fn default_model_timeout_seconds() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub endpoint: String,
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_model_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_universe_size() -> u32 {
    100
}
fn default_universe_cache_hours() -> u32 {
    24
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UniverseConfig {
    #[serde(default = "default_universe_size")]
    pub size: u32,
    #[serde(default = "default_universe_cache_hours")]
    pub cache_hours: u32,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            size: default_universe_size(),
            cache_hours: default_universe_cache_hours(),
        }
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}
