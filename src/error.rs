use thiserror::Error;

/// Outcomes surfaced to callers. Classification itself never fails: only bad
/// input, and the model/persistence management operations, produce errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input was missing, not a string, or blank.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A batch contained no usable text items.
    #[error("No valid input: every item was empty or not a string")]
    NoValidInput,

    /// Errors from the feedback store.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Errors while reloading model artifacts.
    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
