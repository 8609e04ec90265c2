//! The per-turn accumulation state machine.

use std::sync::Arc;

use tracing::warn;

use quill_proto::{MessageStatus, StreamEvent};

use crate::gateway::PersistenceGateway;
use crate::source::SourceError;
use crate::writer::StreamWriter;

/// Durable identifiers for one chat turn, all minted before streaming begins.
#[derive(Debug, Clone)]
pub struct TurnIds {
    pub chat_id: String,
    pub user_message_id: String,
    pub assistant_message_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    None,
    Done,
    Interrupted,
    Errored,
}

/// Accumulates fragments into the transcript buffer and re-emits them as wire
/// events, tagging the first one with the identifiers the client needs to
/// splice in the durable records.
///
/// Exactly one of [`on_cancel`](Self::on_cancel) /
/// [`on_complete`](Self::on_complete) /
/// [`on_source_error`](Self::on_source_error) runs to completion for a given
/// aggregator; later calls are no-ops.  Durable state is flushed only at
/// those terminal checkpoints, never per fragment.
pub struct ChunkAggregator<G: PersistenceGateway> {
    gateway: Arc<G>,
    writer: StreamWriter,
    turn: TurnIds,
    accumulated: String,
    first_sent: bool,
    terminal: Terminal,
}

impl<G: PersistenceGateway> ChunkAggregator<G> {
    pub fn new(gateway: Arc<G>, writer: StreamWriter, turn: TurnIds) -> Self {
        Self {
            gateway,
            writer,
            turn,
            accumulated: String::new(),
            first_sent: false,
            terminal: Terminal::None,
        }
    }

    /// Fold one fragment in and flush it to the client.
    ///
    /// Returns `false` when the sink has closed underneath us (client gone);
    /// the session then finalizes the turn as interrupted.  Must not be
    /// called after a terminal operation.
    pub async fn on_fragment(&mut self, fragment: &str) -> bool {
        debug_assert!(
            self.terminal == Terminal::None,
            "fragment after terminal event"
        );
        if self.terminal != Terminal::None {
            return false;
        }
        if fragment.is_empty() {
            return true;
        }

        self.accumulated.push_str(fragment);
        let event = if self.first_sent {
            StreamEvent::chunk(fragment, &self.turn.assistant_message_id)
        } else {
            self.first_sent = true;
            StreamEvent::first_chunk(
                fragment,
                &self.turn.assistant_message_id,
                &self.turn.user_message_id,
                &self.turn.chat_id,
            )
        };
        self.writer.write(&event).await
    }

    /// Cancellation observed: persist everything produced so far as
    /// `INTERRUPTED`, tell the client, close the channel.  Idempotent.
    pub async fn on_cancel(&mut self) {
        if self.terminal != Terminal::None {
            return;
        }
        self.terminal = Terminal::Interrupted;

        self.persist(MessageStatus::Interrupted).await;
        self.writer
            .write(&StreamEvent::Interrupt {
                message_id: self.turn.assistant_message_id.clone(),
                final_content: self.accumulated.clone(),
            })
            .await;
        self.writer.close().await;
    }

    /// The token stream ended normally: persist as `COMPLETED`, emit `done`,
    /// close the channel.
    pub async fn on_complete(&mut self) {
        if self.terminal != Terminal::None {
            return;
        }
        self.terminal = Terminal::Done;

        self.persist(MessageStatus::Completed).await;
        self.writer.write(&StreamEvent::Done).await;
        self.writer.close().await;
    }

    /// The source failed for a non-cancellation reason: persist the partial
    /// content as `FAILED` so the row never strands in `PENDING`, emit a
    /// generic `error` event, close the channel.
    pub async fn on_source_error(&mut self, error: &SourceError) {
        if self.terminal != Terminal::None {
            return;
        }
        self.terminal = Terminal::Errored;

        warn!(
            message_id = %self.turn.assistant_message_id,
            error = %error,
            "token source failed mid-stream"
        );
        self.persist(MessageStatus::Failed).await;
        self.writer
            .write(&StreamEvent::Error {
                error: "an error occurred while streaming the response".into(),
            })
            .await;
        self.writer.close().await;
    }

    /// Accumulated content so far; the interrupt event carries this in full.
    pub fn content(&self) -> &str {
        &self.accumulated
    }

    async fn persist(&self, status: MessageStatus) {
        // A failed checkpoint write must not block the terminal event or the
        // channel close; the client-visible stream outcome wins.
        if let Err(e) = self
            .gateway
            .update_message(&self.turn.assistant_message_id, &self.accumulated, status)
            .await
        {
            warn!(
                message_id = %self.turn.assistant_message_id,
                status = %status,
                error = %e,
                "failed to persist final message state"
            );
        }
    }
}
