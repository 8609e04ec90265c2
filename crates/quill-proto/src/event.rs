//! Stream events and the enums persisted alongside messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Sender {
    User,
    Ai,
}

/// Lifecycle status of a message.
///
/// `Pending` is the only non-terminal status.  Legal transitions are
/// `Pending → Completed | Interrupted | Failed`; terminal statuses are
/// immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Assistant message created, content still growing.
    Pending,
    /// Generation ran to the end of the token stream.
    Completed,
    /// Generation was cancelled; content holds everything produced so far.
    Interrupted,
    /// The upstream model call failed mid-stream.
    Failed,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }
}

/// One event on a chat-turn stream.
///
/// The first `chunk` of a turn carries `user_message_id` and `chat_id` so the
/// client can replace its optimistic placeholder with the durable records;
/// every later `chunk` carries only the fragment and the assistant message id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    Chunk {
        content: String,
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_message_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chat_id: Option<String>,
    },
    /// Generation was cancelled.  `final_content` is the authoritative full
    /// text of the assistant message, not a delta.
    Interrupt {
        message_id: String,
        final_content: String,
    },
    /// The upstream model call failed after streaming had started.
    Error { error: String },
    /// Generation completed normally.
    Done,
}

impl StreamEvent {
    /// First chunk of a turn, carrying the identifiers the client needs to
    /// splice the durable user and assistant messages into its transcript.
    pub fn first_chunk(
        content: impl Into<String>,
        message_id: impl Into<String>,
        user_message_id: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        StreamEvent::Chunk {
            content: content.into(),
            message_id: message_id.into(),
            user_message_id: Some(user_message_id.into()),
            chat_id: Some(chat_id.into()),
        }
    }

    /// A plain incremental chunk.
    pub fn chunk(content: impl Into<String>, message_id: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            content: content.into(),
            message_id: message_id.into(),
            user_message_id: None,
            chat_id: None,
        }
    }

    /// `true` for the events that end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Interrupt { .. } | StreamEvent::Error { .. } | StreamEvent::Done
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
