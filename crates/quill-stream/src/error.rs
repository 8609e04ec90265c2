//! Token-source error taxonomy.

use thiserror::Error;

/// Failure outcomes of a generation call.
///
/// Cancellation is distinguished from every other failure: the pipeline
/// finalizes a cancelled turn as `INTERRUPTED`, while any other variant takes
/// the error path and finalizes as `FAILED`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The cancellation signal fired; not a fault.
    #[error("generation cancelled")]
    Cancelled,

    /// Transport-level failure talking to the model endpoint.
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model endpoint answered with a non-success status.
    #[error("upstream returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The upstream stream violated the expected format.
    #[error("malformed upstream stream: {0}")]
    Protocol(String),
}

impl SourceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SourceError::Cancelled)
    }
}
