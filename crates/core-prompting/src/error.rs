use thiserror::Error;

/// Errors raised assembling prompts, calling the Model collaborator, or
/// parsing its response. `ParseError`/`SchemaError`/`CopyPasteSuspected`
/// correspond to the `ParsedResult` variants spec §4.D names — modeled as
/// distinct error variants rather than a custom result enum so callers can
/// use ordinary `?` propagation and match only where they need to.
#[derive(Error, Debug)]
pub enum PromptingError {
    #[error("model call failed: {0}")]
    Model(String),

    #[error("model call timed out after {0}s")]
    Timeout(u64),

    #[error("no JSON object found in model response (raw_text={raw_text:?})")]
    ParseError { raw_text: String },

    #[error("response failed schema validation: {0}")]
    SchemaError(String),

    #[error("reasoning field matches a TaskInstruction template verbatim")]
    CopyPasteSuspected,

    #[error("risk gate rejected: {0}")]
    Risk(String),

    #[error("model invariant violated: {0}")]
    Invariant(#[from] core_models::ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
