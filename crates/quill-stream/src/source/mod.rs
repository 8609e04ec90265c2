//! Token sources: one LLM completion call exposed as a lazy fragment stream.

mod openai;
mod scripted;

use std::future::Future;

use tokio::sync::{mpsc, watch};

pub use crate::error::SourceError;
pub use openai::OpenAiSource;
pub use scripted::ScriptedSource;

/// Bound on fragments buffered ahead of the consumer; keeps the producer
/// lazy under backpressure instead of racing ahead of the write loop.
pub(crate) const FRAGMENT_CHANNEL_CAPACITY: usize = 32;

/// A handle to an in-flight generation.
///
/// Yields non-empty text fragments in production order.  The sequence ends
/// either by the channel closing (generation complete) or with a single
/// `Err` item — `SourceError::Cancelled` when the cancellation signal was
/// observed, any other variant for upstream failure — after which the
/// producer yields nothing more.
pub type FragmentStream = mpsc::Receiver<Result<String, SourceError>>;

/// A single completion call-out, cancellable via a watch signal.
pub trait TokenSource: Send + Sync + 'static {
    /// Start generating a reply to `prompt` with the model `model_id`.
    ///
    /// An immediate failure (connect error, rejected request) surfaces as
    /// `Err` here; failures after streaming has begun arrive through the
    /// returned stream.  The producer checks `cancel` at every step and must
    /// not yield after signalling cancellation or failure.
    fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        cancel: watch::Receiver<bool>,
    ) -> impl Future<Output = Result<FragmentStream, SourceError>> + Send;
}
