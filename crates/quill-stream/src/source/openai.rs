//! OpenAI-compatible streaming completion source.

use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::cancel;
use crate::error::SourceError;
use crate::source::{FRAGMENT_CHANNEL_CAPACITY, FragmentStream, TokenSource};

/// Wraps a single `POST {base_url}/chat/completions` call with
/// `stream: true` against any OpenAI-compatible endpoint and forwards the
/// `choices[0].delta.content` pieces as fragments.
pub struct OpenAiSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiSource {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }
}

impl TokenSource for OpenAiSource {
    async fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<FragmentStream, SourceError> {
        let body = serde_json::json!({
            "model": model_id,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": true,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let (tx, rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);
        tokio::spawn(forward_deltas(response, tx, cancel));
        Ok(rx)
    }
}

/// Consume the upstream SSE body and forward content deltas until the stream
/// ends, the cancellation signal fires, or the consumer goes away.
async fn forward_deltas(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<String, SourceError>>,
    cancel: watch::Receiver<bool>,
) {
    let mut body = response.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel::fired(cancel.clone()) => {
                debug!("cancellation observed; abandoning upstream stream");
                let _ = tx.send(Err(SourceError::Cancelled)).await;
                return;
            }
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    if !drain_frames(&mut buf, &bytes, &tx).await {
                        return;
                    }
                }
                Some(Err(e)) => {
                    let _ = tx.send(Err(SourceError::Http(e))).await;
                    return;
                }
                // Upstream closed the connection; anything buffered without a
                // trailing delimiter is an incomplete frame and is dropped.
                None => return,
            }
        }
    }
}

/// Append `bytes`, extract every complete `data:` frame, forward its delta.
/// Returns `false` once the stream is finished (`[DONE]` seen or consumer
/// dropped).
async fn drain_frames(
    buf: &mut Vec<u8>,
    bytes: &Bytes,
    tx: &mpsc::Sender<Result<String, SourceError>>,
) -> bool {
    buf.extend_from_slice(bytes);
    while let Some(pos) = buf.windows(2).position(|w| w == b"\n\n") {
        let frame: Vec<u8> = buf.drain(..pos + 2).collect();
        let Ok(text) = std::str::from_utf8(&frame[..pos]) else {
            warn!("upstream frame is not valid UTF-8; skipping");
            continue;
        };
        for line in text.lines() {
            let Some(payload) = line.trim_end_matches('\r').strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim_start();
            if payload == "[DONE]" {
                return false;
            }
            if let Some(delta) = extract_delta(payload) {
                if !delta.is_empty() && tx.send(Ok(delta)).await.is_err() {
                    return false;
                }
            }
        }
    }
    true
}

/// Pull `choices[0].delta.content` out of one streamed completion payload.
fn extract_delta(payload: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable upstream payload; skipping");
            return None;
        }
    };
    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_owned)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extract_delta_reads_streamed_content() {
        let payload = r#"{"choices":[{"delta":{"content":"Hel"},"index":0}]}"#;
        assert_eq!(extract_delta(payload), Some("Hel".to_owned()));
    }

    #[test]
    fn extract_delta_handles_role_only_chunks() {
        let payload = r#"{"choices":[{"delta":{"role":"assistant"},"index":0}]}"#;
        assert_eq!(extract_delta(payload), None);
    }

    #[tokio::test]
    async fn drain_frames_forwards_deltas_and_stops_on_done() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut buf = Vec::new();

        let upstream = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let keep_going = drain_frames(&mut buf, &Bytes::from_static(upstream.as_bytes()), &tx).await;
        assert!(!keep_going);
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().unwrap(), "Hi");
        assert_eq!(rx.recv().await.unwrap().unwrap(), " there");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn drain_frames_buffers_partial_frames() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut buf = Vec::new();

        let whole = "data: {\"choices\":[{\"delta\":{\"content\":\"abc\"}}]}\n\n";
        let (head, tail) = whole.as_bytes().split_at(20);

        assert!(drain_frames(&mut buf, &Bytes::copy_from_slice(head), &tx).await);
        assert!(rx.try_recv().is_err(), "no complete frame yet");
        assert!(drain_frames(&mut buf, &Bytes::copy_from_slice(tail), &tx).await);
        assert_eq!(rx.recv().await.unwrap().unwrap(), "abc");
    }
}
