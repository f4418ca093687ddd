use thiserror::Error;

/// Top-level error for the `core` crate: the TradingAgent orchestrator and
/// the `trading-agent` CLI. Library crates below this one never depend on
/// `anyhow`; this enum is the seam where their `thiserror` errors converge
/// before the binary wraps startup failures in `anyhow::Context`.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] core_store::StoreError),

    #[error("prompting error: {0}")]
    Prompting(#[from] core_prompting::PromptingError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] core_scheduler::SchedulerError),

    #[error("indicator error: {0}")]
    Indicator(#[from] core_indicators::IndicatorError),

    #[error("model invariant violated: {0}")]
    ModelInvariant(#[from] core_models::ModelError),

    #[error("broker does not advertise paper mode, refusing to initialize")]
    NotPaperAccount,
}
