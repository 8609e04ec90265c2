//! Reads the server's event stream and dispatches decoded events.

use futures::StreamExt;
use tokio::sync::watch;

use quill_proto::{FrameDecoder, StreamEvent};

use crate::error::ClientError;

/// How a read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The stream delivered a terminal event or ended.
    Finished,
    /// Local cancellation was requested before the stream ended.
    Cancelled,
}

/// Consume the SSE response body, feeding every decoded event to `on_event`.
///
/// Frames may arrive split across read boundaries; the [`FrameDecoder`]
/// buffers undecoded remainder between reads, so no delivery alignment is
/// assumed.  Reading stops at the first terminal event, at end of stream, or
/// when `cancel` fires.  On cancellation the response is dropped, which
/// aborts the underlying connection — the server observes the disconnect and
/// stops generation cooperatively; no further events are dispatched.
pub async fn read_stream<F>(
    response: reqwest::Response,
    cancel: watch::Receiver<bool>,
    mut on_event: F,
) -> Result<ReadOutcome, ClientError>
where
    F: FnMut(&StreamEvent),
{
    let mut body = response.bytes_stream();
    let mut decoder = FrameDecoder::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel_fired(cancel.clone()) => {
                // Dropping `body` (and with it the response) closes the
                // connection, which is the upstream abort signal.
                return Ok(ReadOutcome::Cancelled);
            }
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.feed(&bytes)? {
                        let terminal = event.is_terminal();
                        on_event(&event);
                        if terminal {
                            return Ok(ReadOutcome::Finished);
                        }
                    }
                }
                Some(Err(e)) => return Err(ClientError::Http(e)),
                None => return Ok(ReadOutcome::Finished),
            }
        }
    }
}

/// Resolves once the cancellation signal observes `true`; pends forever if
/// the sender is dropped without firing.
async fn cancel_fired(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
