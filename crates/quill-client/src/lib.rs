//! Client-side half of the quill streaming protocol.
//!
//! [`reader`] consumes the SSE byte stream from `POST /v1/chat`, reassembles
//! frames across read boundaries, and hands each decoded event to a callback;
//! cancelling locally drops the connection so the server observes the abort
//! and finalizes the turn as interrupted.
//!
//! [`reducer`] is the pure state machine that folds those events into an
//! ordered, append-only transcript: the optimistic placeholder user message
//! is swapped for the durable records on the first chunk, fragments append,
//! and exactly one terminal event settles the assistant message.
//!
//! [`api`] is a thin typed client for the server's JSON endpoints.

pub mod api;
pub mod error;
pub mod reader;
pub mod reducer;

pub use api::QuillClient;
pub use error::ClientError;
pub use reader::{ReadOutcome, read_stream};
pub use reducer::{TranscriptMessage, apply_event, placeholder_user};
