pub mod account;
pub mod bar;
pub mod config;
pub mod decision;
pub mod error;
pub mod market;
pub mod news;
pub mod overnight;
pub mod prompt_component;
pub mod query_context;
pub mod universe;

pub use account::{AccountState, Position};
pub use bar::{Bar, BandPosition, IndicatorSet, MomentumSignal, SignalBlock, TrendSignal};
pub use config::{Config, MarketConfig, ModelConfig, RiskConfig, TradingConfig, UniverseConfig};
pub use decision::{
    Action, Decision, ExecutionOutcome, RankAction, RankedPosition, Ranking, RiskFactor,
    RiskResult, Sentiment, Severity,
};
pub use error::ModelError;
pub use market::MarketState;
pub use news::{NarrativeSynthesis, NewsArticle, NewsRecommendation, NewsTimeline};
pub use overnight::{
    AnalysisDepth, ConversationTurn, FinalRecommendation, OvernightAnalysis, OvernightSummary,
    Pattern,
};
pub use prompt_component::PromptComponent;
pub use query_context::{
    DetailLevel, ExpectedFormat, ProfileThresholds, QueryContext, QueryType, TradingProfile,
    Trigger,
};
pub use universe::{UniverseEntry, UniverseReason};
