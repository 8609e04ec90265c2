//! Wire types shared by the quill server and clients.
//!
//! A chat turn is streamed as a sequence of [`StreamEvent`]s, one SSE frame
//! (`data: <JSON>\n\n`) per event.  The sequence for one assistant message is:
//! at most one identifier-bearing first `chunk`, any number of plain `chunk`s,
//! and exactly one terminal event (`interrupt`, `error` or `done`).  Nothing
//! follows a terminal event.
//!
//! [`frame`] contains the frame encoder used by the server and the buffering
//! [`frame::FrameDecoder`] used by clients to reassemble frames that arrive
//! split across read boundaries.

pub mod event;
pub mod frame;

pub use event::{MessageStatus, Sender, StreamEvent};
pub use frame::{FrameDecoder, FrameError, encode_frame};
