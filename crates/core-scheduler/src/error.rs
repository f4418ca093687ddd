use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("broker probe failed: {0}")]
    BrokerProbe(String),

    #[error("store error: {0}")]
    Store(#[from] core_store::StoreError),

    #[error("prompting error: {0}")]
    Prompting(#[from] core_prompting::PromptingError),

    #[error("task {task} exceeded its iteration budget")]
    IterationBudgetExceeded { task: String },
}
