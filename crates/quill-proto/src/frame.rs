//! SSE framing: `data: <JSON>\n\n` per event.
//!
//! The decoder buffers raw bytes until a complete frame delimiter is seen, so
//! it is safe to feed it reads that split a frame — or a multi-byte UTF-8
//! sequence — at any boundary.  Comment lines (leading `:`) and non-`data`
//! fields inside a frame are ignored, per the SSE format.

use thiserror::Error;

use crate::event::StreamEvent;

const DATA_PREFIX: &str = "data:";

/// Encode one event as a single SSE frame.
pub fn encode_frame(event: &StreamEvent) -> String {
    // INVARIANT: StreamEvent contains only strings; serialization cannot fail.
    let json = serde_json::to_string(event).expect("StreamEvent always serializes");
    format!("data: {json}\n\n")
}

/// Errors surfaced while decoding an event stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A complete frame was not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A `data:` payload was not a known event.
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Incremental decoder for a byte stream of SSE frames.
///
/// `feed` may be called with arbitrarily sliced input; undecoded remainder is
/// buffered across calls.  When the transport happens to deliver whole frames,
/// buffering degenerates to a straight pass-through.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and decode every complete frame now available.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<StreamEvent>, FrameError> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some((frame_len, delim_len)) = find_frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..frame_len + delim_len).collect();
            let text = std::str::from_utf8(&frame[..frame_len])?;
            for line in text.lines() {
                let line = line.trim_end_matches('\r');
                let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                    continue;
                };
                let payload = payload.strip_prefix(' ').unwrap_or(payload);
                if payload.is_empty() {
                    continue;
                }
                events.push(serde_json::from_str(payload)?);
            }
        }
        Ok(events)
    }

    /// Bytes buffered but not yet decodable as a complete frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Locate the earliest frame delimiter, returning `(frame_len, delim_len)`.
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, None) => a,
        (None, b) => b,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whole_frame_decodes() {
        let mut dec = FrameDecoder::new();
        let frame = encode_frame(&StreamEvent::chunk("Hi", "m1"));
        let events = dec.feed(frame.as_bytes()).unwrap();
        assert_eq!(events, vec![StreamEvent::chunk("Hi", "m1")]);
        assert_eq!(dec.pending(), 0);
    }

    #[test]
    fn frame_split_across_reads_is_reassembled() {
        let mut dec = FrameDecoder::new();
        let frame = encode_frame(&StreamEvent::chunk("hello world", "m1"));
        let (head, tail) = frame.as_bytes().split_at(9);

        assert!(dec.feed(head).unwrap().is_empty());
        assert!(dec.pending() > 0);
        let events = dec.feed(tail).unwrap();
        assert_eq!(events, vec![StreamEvent::chunk("hello world", "m1")]);
    }

    #[test]
    fn several_frames_in_one_read() {
        let mut dec = FrameDecoder::new();
        let mut bytes = encode_frame(&StreamEvent::chunk("a", "m1"));
        bytes.push_str(&encode_frame(&StreamEvent::chunk("b", "m1")));
        bytes.push_str(&encode_frame(&StreamEvent::Done));
        let events = dec.feed(bytes.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], StreamEvent::Done);
    }

    #[test]
    fn multibyte_utf8_split_at_read_boundary() {
        let mut dec = FrameDecoder::new();
        let frame = encode_frame(&StreamEvent::chunk("héllo", "m1"));
        let bytes = frame.as_bytes();
        // Split inside the two-byte 'é' sequence.
        let split = frame.find('é').unwrap() + 1;
        assert!(dec.feed(&bytes[..split]).unwrap().is_empty());
        let events = dec.feed(&bytes[split..]).unwrap();
        assert_eq!(events, vec![StreamEvent::chunk("héllo", "m1")]);
    }

    #[test]
    fn crlf_delimited_frames_decode() {
        let mut dec = FrameDecoder::new();
        let body = r#"data: {"type":"done"}"#;
        let events = dec.feed(format!("{body}\r\n\r\n").as_bytes()).unwrap();
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn comment_and_empty_lines_are_ignored() {
        let mut dec = FrameDecoder::new();
        let events = dec
            .feed(b": keep-alive\n\ndata: {\"type\":\"done\"}\n\n")
            .unwrap();
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let mut dec = FrameDecoder::new();
        assert!(dec.feed(b"data: {\"type\":\"nope\"}\n\n").is_err());
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let mut dec = FrameDecoder::new();
        let frame = encode_frame(&StreamEvent::Interrupt {
            message_id: "m1".into(),
            final_content: "Partial".into(),
        });
        let mut events = Vec::new();
        for b in frame.as_bytes() {
            events.extend(dec.feed(std::slice::from_ref(b)).unwrap());
        }
        assert_eq!(
            events,
            vec![StreamEvent::Interrupt {
                message_id: "m1".into(),
                final_content: "Partial".into(),
            }]
        );
    }
}
