//! The pure transcript reducer.
//!
//! `(orderedMessages, event) -> orderedMessages'` — no IO, no clocks.  Events
//! only ever mutate the matched message in place or append at the tail;
//! relative order of existing messages is never changed.

use uuid::Uuid;

use quill_proto::{MessageStatus, Sender, StreamEvent};

/// Id prefix of locally-synthesized, not-yet-durable user messages.
pub const PLACEHOLDER_PREFIX: &str = "temp-user-";

/// Client-side view of one message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub id: String,
    pub chat_id: String,
    pub sender: Sender,
    pub content: String,
    pub status: MessageStatus,
    pub model: Option<String>,
}

/// The optimistic user message shown before the server confirms identifiers.
pub fn placeholder_user(content: &str, chat_id: Option<&str>) -> TranscriptMessage {
    TranscriptMessage {
        id: format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4()),
        chat_id: chat_id.unwrap_or("temp-chat").to_owned(),
        sender: Sender::User,
        content: content.to_owned(),
        status: MessageStatus::Completed,
        model: None,
    }
}

/// Fold one stream event into the transcript.
pub fn apply_event(
    mut messages: Vec<TranscriptMessage>,
    event: &StreamEvent,
) -> Vec<TranscriptMessage> {
    match event {
        StreamEvent::Chunk {
            content,
            message_id,
            user_message_id: Some(user_message_id),
            chat_id: Some(chat_id),
        } => {
            // First chunk: swap the placeholder for the durable user message
            // and append the new assistant message at the tail.
            let user_content = match messages
                .iter()
                .rposition(|m| m.id.starts_with(PLACEHOLDER_PREFIX))
            {
                Some(pos) => messages.remove(pos).content,
                None => String::new(),
            };
            messages.push(TranscriptMessage {
                id: user_message_id.clone(),
                chat_id: chat_id.clone(),
                sender: Sender::User,
                content: user_content,
                status: MessageStatus::Completed,
                model: None,
            });
            messages.push(TranscriptMessage {
                id: message_id.clone(),
                chat_id: chat_id.clone(),
                sender: Sender::Ai,
                content: content.clone(),
                status: MessageStatus::Pending,
                model: None,
            });
        }

        StreamEvent::Chunk {
            content,
            message_id,
            ..
        } => {
            // Append to the matched assistant message; unknown id is a no-op.
            if let Some(message) = messages.iter_mut().find(|m| &m.id == message_id) {
                message.content.push_str(content);
            }
        }

        StreamEvent::Interrupt {
            message_id,
            final_content,
        } => {
            // The event's full final content is authoritative, not the
            // locally-accumulated chunks.
            if let Some(message) = messages.iter_mut().find(|m| &m.id == message_id) {
                message.content = final_content.clone();
                message.status = MessageStatus::Interrupted;
            }
        }

        StreamEvent::Error { .. } => {
            // The partial, un-persisted attempt disappears from the visible
            // transcript; surfacing the failure is the caller's concern.
            if let Some(pos) = messages
                .iter()
                .rposition(|m| m.sender == Sender::Ai && m.status == MessageStatus::Pending)
            {
                messages.remove(pos);
            }
        }

        StreamEvent::Done => {
            if let Some(message) = messages
                .iter_mut()
                .rev()
                .find(|m| m.sender == Sender::Ai && m.status == MessageStatus::Pending)
            {
                message.status = MessageStatus::Completed;
            }
        }
    }
    messages
}

// ── Tests ──────────────────────────────────────────────────────────────────────
