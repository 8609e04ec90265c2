//! Scripted token source for tests and keyless development.

use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::cancel;
use crate::error::SourceError;
use crate::source::{FRAGMENT_CHANNEL_CAPACITY, FragmentStream, TokenSource};

/// Emits a fixed fragment script, optionally paced, honoring cancellation
/// between fragments.  Stands in for a real model when no API key is
/// configured, and gives pipeline tests deterministic fragment sequences.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    fragments: Vec<String>,
    delay: Option<Duration>,
    fail_after: Option<usize>,
}

impl ScriptedSource {
    pub fn new(fragments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            delay: None,
            fail_after: None,
        }
    }

    /// Split `text` into fragments of at most `chunk_size` characters.
    pub fn from_text(text: &str, chunk_size: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let fragments = chars
            .chunks(chunk_size.max(1))
            .map(|c| c.iter().collect::<String>())
            .collect::<Vec<_>>();
        Self::new(fragments)
    }

    /// Sleep `delay` before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail with a generic source error instead of emitting fragment `n`.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl TokenSource for ScriptedSource {
    async fn generate(
        &self,
        _prompt: &str,
        _model_id: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<FragmentStream, SourceError> {
        let fragments = self.fragments.clone();
        let delay = self.delay;
        let fail_after = self.fail_after;

        let (tx, rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for (i, fragment) in fragments.into_iter().enumerate() {
                if fail_after == Some(i) {
                    let _ = tx
                        .send(Err(SourceError::Protocol("scripted failure".into())))
                        .await;
                    return;
                }
                if *cancel.borrow() {
                    let _ = tx.send(Err(SourceError::Cancelled)).await;
                    return;
                }
                if let Some(delay) = delay {
                    tokio::select! {
                        biased;
                        _ = cancel::fired(cancel.clone()) => {
                            let _ = tx.send(Err(SourceError::Cancelled)).await;
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                if fragment.is_empty() {
                    continue;
                }
                if tx.send(Ok(fragment)).await.is_err() {
                    // Consumer gone; nothing left to produce for.
                    return;
                }
            }
        });
        Ok(rx)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn emits_script_in_order_then_closes() {
        let source = ScriptedSource::new(["a", "b", "c"]);
        let (_tx, cancel) = watch::channel(false);
        let mut stream = source.generate("prompt", "model", cancel).await.unwrap();

        let mut got = Vec::new();
        while let Some(item) = stream.recv().await {
            got.push(item.unwrap());
        }
        assert_eq!(got, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_fragments_are_suppressed() {
        let source = ScriptedSource::new(["a", "", "b"]);
        let (_tx, cancel) = watch::channel(false);
        let mut stream = source.generate("prompt", "model", cancel).await.unwrap();

        let mut got = Vec::new();
        while let Some(item) = stream.recv().await {
            got.push(item.unwrap());
        }
        assert_eq!(got, ["a", "b"]);
    }

    #[tokio::test]
    async fn cancellation_ends_stream_with_cancelled() {
        let source =
            ScriptedSource::new(["a", "b", "c"]).with_delay(Duration::from_millis(200));
        let (tx, cancel) = watch::channel(false);
        let mut stream = source.generate("prompt", "model", cancel).await.unwrap();

        let first = stream.recv().await.unwrap().unwrap();
        assert_eq!(first, "a");
        tx.send(true).unwrap();

        match stream.recv().await {
            Some(Err(SourceError::Cancelled)) => {}
            other => panic!("expected cancelled, got {other:?}"),
        }
        assert!(stream.recv().await.is_none(), "nothing after cancellation");
    }

    #[tokio::test]
    async fn failure_injection_ends_stream() {
        let source = ScriptedSource::new(["a", "b"]).failing_after(1);
        let (_tx, cancel) = watch::channel(false);
        let mut stream = source.generate("prompt", "model", cancel).await.unwrap();

        assert_eq!(stream.recv().await.unwrap().unwrap(), "a");
        assert!(matches!(
            stream.recv().await,
            Some(Err(SourceError::Protocol(_)))
        ));
        assert!(stream.recv().await.is_none());
    }

    #[test]
    fn from_text_chunks_by_characters() {
        let source = ScriptedSource::from_text("hello world!", 5);
        assert_eq!(source.fragments, ["hello", " worl", "d!"]);
    }
}
