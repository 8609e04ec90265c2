//! The server-side streaming pipeline for one chat turn.
//!
//! A turn flows through four pieces:
//!
//! 1. A [`source::TokenSource`] wraps a single LLM completion call and exposes
//!    it as a lazy, cancellable sequence of text fragments.
//! 2. The [`aggregator::ChunkAggregator`] folds fragments into the transcript
//!    buffer, re-emits them as wire events (tagging the first one with the
//!    identifiers the client needs), and flushes durable state through the
//!    [`gateway::PersistenceGateway`] at terminal checkpoints only.
//! 3. The [`writer::StreamWriter`] serializes events onto the SSE channel and
//!    owns its at-most-once closure.
//! 4. The [`session::StreamSession`] wires the three together and races the
//!    token loop against client disconnect over one cancellation watch.
//!
//! Everything here is local to a single streaming session; the only shared
//! mutable state is the writer's close guard.

pub mod aggregator;
pub mod cancel;
pub mod error;
pub mod gateway;
pub mod session;
pub mod source;
pub mod writer;

pub use aggregator::{ChunkAggregator, TurnIds};
pub use error::SourceError;
pub use gateway::PersistenceGateway;
pub use session::StreamSession;
pub use source::{FragmentStream, OpenAiSource, ScriptedSource, TokenSource};
pub use writer::StreamWriter;

#[cfg(test)]
mod tests;
