//! SSE sink with at-most-once closure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::debug;

use quill_proto::{StreamEvent, encode_frame};

/// Wraps the frame channel feeding one SSE response body.
///
/// Two paths race to close the channel — normal terminal completion and the
/// client-disconnect listener — so closure is guarded by an atomic
/// compare-and-set: whichever caller wins drops the sender (ending the
/// response body), every other attempt is a no-op.  Writes after close are
/// swallowed and logged; a closed sink is never a caller-visible fault.
pub struct StreamWriter {
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    closed: AtomicBool,
    shutdown: Arc<Notify>,
}

impl StreamWriter {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            closed: AtomicBool::new(false),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Encode and flush one event.
    ///
    /// Returns `false` when the sink is closed or the receiver is gone; the
    /// caller treats that as a client disconnect, not an error.
    pub async fn write(&self, event: &StreamEvent) -> bool {
        if self.closed.load(Ordering::Acquire) {
            debug!("dropping write to closed stream");
            return false;
        }
        let guard = self.tx.lock().await;
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        match tx.send(Bytes::from(encode_frame(event))).await {
            Ok(()) => true,
            Err(_) => {
                // Receiver dropped: the client went away mid-write.
                drop(guard);
                debug!("stream receiver dropped; closing writer");
                self.close().await;
                false
            }
        }
    }

    /// Close the sink.  Idempotent: only the first call drops the sender.
    pub async fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.tx.lock().await.take();
        self.shutdown.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Notified exactly once, when the writer closes.  The disconnect
    /// listener uses this to stop waiting on a session that ended normally.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    fn writer(capacity: usize) -> (StreamWriter, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (StreamWriter::new(tx), rx)
    }

    #[tokio::test]
    async fn write_then_close_delivers_and_ends_stream() {
        let (writer, mut rx) = writer(8);
        assert!(writer.write(&StreamEvent::Done).await);
        writer.close().await;

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none(), "channel must end after close");
    }

    #[tokio::test]
    async fn write_after_close_is_swallowed() {
        let (writer, mut rx) = writer(8);
        writer.close().await;
        assert!(!writer.write(&StreamEvent::Done).await);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn double_close_is_a_no_op() {
        let (writer, mut rx) = writer(8);
        writer.close().await;
        writer.close().await;
        assert!(writer.is_closed());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_closes_execute_once() {
        let (writer, _rx) = writer(8);
        let writer = Arc::new(writer);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let w = Arc::clone(&writer);
            handles.push(tokio::spawn(async move { w.close().await }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(writer.is_closed());
        assert!(writer.tx.lock().await.is_none());
    }

    #[tokio::test]
    async fn receiver_drop_marks_writer_closed() {
        let (writer, rx) = writer(8);
        drop(rx);
        assert!(!writer.write(&StreamEvent::chunk("x", "m1")).await);
        assert!(writer.is_closed());
    }
}
