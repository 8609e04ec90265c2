//! One streaming session: the token loop racing the disconnect listener.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::aggregator::{ChunkAggregator, TurnIds};
use crate::cancel;
use crate::gateway::PersistenceGateway;
use crate::source::{SourceError, TokenSource};
use crate::writer::StreamWriter;

/// Drives one chat turn end to end.
///
/// `new` wires the frame channel, writer and aggregator together and spawns a
/// disconnect listener: when the response-body receiver is dropped (client
/// went away) the listener fires the cancellation watch, which the token loop
/// observes before its next write.  Both the listener-triggered interrupt and
/// normal completion funnel into the writer's single close guard, so the
/// channel closes at most once no matter which path wins.
///
/// Everything after `run` happens in a detached task; failures surface only
/// through the stream protocol and the persisted message status, never past
/// the request boundary.
pub struct StreamSession<G: PersistenceGateway> {
    aggregator: ChunkAggregator<G>,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl<G: PersistenceGateway> StreamSession<G> {
    /// Build a session and the frame receiver that backs the SSE response
    /// body.  `capacity` bounds frames buffered ahead of the client.
    pub fn new(gateway: Arc<G>, turn: TurnIds, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (frame_tx, frame_rx) = mpsc::channel(capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let writer = StreamWriter::new(frame_tx.clone());
        let shutdown = writer.shutdown_handle();

        // Disconnect listener: the receiver half of the frame channel lives
        // inside the response body, so its drop is the disconnect signal.
        // The shutdown branch releases this task (and its sender clone, which
        // would otherwise hold the channel open) once the session closes
        // normally.
        let listener_cancel = cancel_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = frame_tx.closed() => {
                    debug!("client disconnected; signalling cancellation");
                    let _ = listener_cancel.send(true);
                }
                _ = shutdown.notified() => {}
            }
        });

        let aggregator = ChunkAggregator::new(gateway, writer, turn);
        (
            Self {
                aggregator,
                cancel_tx,
                cancel_rx,
            },
            frame_rx,
        )
    }

    /// A handle that fires this session's cancellation signal.
    pub fn cancel_handle(&self) -> watch::Sender<bool> {
        self.cancel_tx.clone()
    }

    /// Start generation and pump fragments until a terminal event.
    pub async fn run<S: TokenSource>(mut self, source: Arc<S>, prompt: String, model_id: String) {
        let stream = source
            .generate(&prompt, &model_id, self.cancel_rx.clone())
            .await;
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) if e.is_cancelled() => {
                self.aggregator.on_cancel().await;
                return;
            }
            Err(e) => {
                self.aggregator.on_source_error(&e).await;
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                // Cancellation is checked ahead of the next fragment so it is
                // observed within one production step.
                _ = cancel::fired(self.cancel_rx.clone()) => {
                    self.aggregator.on_cancel().await;
                    return;
                }
                next = stream.recv() => match next {
                    Some(Ok(fragment)) => {
                        if !self.aggregator.on_fragment(&fragment).await {
                            // Sink closed mid-write: finalize as interrupted.
                            self.aggregator.on_cancel().await;
                            return;
                        }
                    }
                    Some(Err(SourceError::Cancelled)) => {
                        self.aggregator.on_cancel().await;
                        return;
                    }
                    Some(Err(e)) => {
                        self.aggregator.on_source_error(&e).await;
                        return;
                    }
                    None => {
                        self.aggregator.on_complete().await;
                        return;
                    }
                }
            }
        }
    }
}
