//! Client error taxonomy.

use thiserror::Error;

use quill_proto::FrameError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The event stream could not be decoded.
    #[error(transparent)]
    Frame(#[from] FrameError),
}
