use thiserror::Error;

/// Errors raised while constructing or validating data-model values.
/// Distinct from component-level errors (parse/schema/risk/store), which
/// live in their owning crates.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("invariant violated: {0}")]
    Invariant(String),
}
