//! End-to-end pipeline tests over scripted sources and a recording gateway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use quill_proto::{FrameDecoder, MessageStatus, Sender, StreamEvent};

use crate::aggregator::{ChunkAggregator, TurnIds};
use crate::error::SourceError;
use crate::gateway::PersistenceGateway;
use crate::session::StreamSession;
use crate::source::ScriptedSource;
use crate::writer::StreamWriter;

// ── Test doubles ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Update {
    message_id: String,
    content: String,
    status: MessageStatus,
}

/// Records every checkpoint write the pipeline makes.
#[derive(Default)]
struct MemoryGateway {
    updates: Mutex<Vec<Update>>,
}

impl MemoryGateway {
    fn updates(&self) -> Vec<Update> {
        self.updates.lock().unwrap().clone()
    }
}

impl PersistenceGateway for MemoryGateway {
    async fn create_chat(&self, _user_id: &str) -> anyhow::Result<String> {
        Ok("chat-1".to_owned())
    }

    async fn create_message(
        &self,
        _chat_id: &str,
        _content: &str,
        _sender: Sender,
        _status: MessageStatus,
        _model: Option<&str>,
    ) -> anyhow::Result<String> {
        Ok("msg-1".to_owned())
    }

    async fn update_message(
        &self,
        message_id: &str,
        content: &str,
        status: MessageStatus,
    ) -> anyhow::Result<()> {
        self.updates.lock().unwrap().push(Update {
            message_id: message_id.to_owned(),
            content: content.to_owned(),
            status,
        });
        Ok(())
    }
}

fn turn() -> TurnIds {
    TurnIds {
        chat_id: "chat-1".to_owned(),
        user_message_id: "user-msg-1".to_owned(),
        assistant_message_id: "ai-msg-1".to_owned(),
    }
}

/// Drain the frame channel to exhaustion and decode every event.
async fn collect_events(mut rx: mpsc::Receiver<Bytes>) -> Vec<StreamEvent> {
    let mut decoder = FrameDecoder::new();
    let mut events = Vec::new();
    while let Some(frame) = rx.recv().await {
        events.extend(decoder.feed(&frame).expect("server frames must decode"));
    }
    events
}

fn terminal_count(events: &[StreamEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

// ── Done path ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn done_path_persists_the_full_concatenation() {
    let gateway = Arc::new(MemoryGateway::default());
    let (session, rx) = StreamSession::new(Arc::clone(&gateway), turn(), 16);
    let source = Arc::new(ScriptedSource::new(["Hello ", "wor", "ld"]));

    session.run(source, "hi".into(), "test-model".into()).await;
    let events = collect_events(rx).await;

    // First chunk carries the splice identifiers; later chunks do not.
    assert_eq!(
        events[0],
        StreamEvent::first_chunk("Hello ", "ai-msg-1", "user-msg-1", "chat-1")
    );
    assert_eq!(events[1], StreamEvent::chunk("wor", "ai-msg-1"));
    assert_eq!(events[2], StreamEvent::chunk("ld", "ai-msg-1"));
    assert_eq!(events[3], StreamEvent::Done);
    assert_eq!(terminal_count(&events), 1);

    assert_eq!(
        gateway.updates(),
        vec![Update {
            message_id: "ai-msg-1".to_owned(),
            content: "Hello world".to_owned(),
            status: MessageStatus::Completed,
        }]
    );
}

#[tokio::test]
async fn empty_script_completes_with_done_only() {
    let gateway = Arc::new(MemoryGateway::default());
    let (session, rx) = StreamSession::new(Arc::clone(&gateway), turn(), 16);
    let source = Arc::new(ScriptedSource::new(Vec::<String>::new()));

    session.run(source, "hi".into(), "test-model".into()).await;
    let events = collect_events(rx).await;

    assert_eq!(events, vec![StreamEvent::Done]);
    assert_eq!(gateway.updates()[0].status, MessageStatus::Completed);
    assert_eq!(gateway.updates()[0].content, "");
}

// ── Cancellation path ─────────────────────────────────────────────────────────

#[tokio::test]
async fn cancel_after_k_fragments_persists_exactly_the_prefix() {
    let gateway = Arc::new(MemoryGateway::default());
    let (session, mut rx) = StreamSession::new(Arc::clone(&gateway), turn(), 16);
    let cancel = session.cancel_handle();
    let source =
        Arc::new(ScriptedSource::new(["one ", "two ", "three"]).with_delay(Duration::from_millis(200)));

    let run = tokio::spawn(session.run(source, "hi".into(), "test-model".into()));

    let mut decoder = FrameDecoder::new();
    let mut events = Vec::new();
    while let Some(frame) = rx.recv().await {
        events.extend(decoder.feed(&frame).unwrap());
        let chunks = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Chunk { .. }))
            .count();
        if chunks == 2 {
            // May fire more than once as trailing frames drain; only the
            // first send matters and late sends can race receiver teardown.
            let _ = cancel.send(true);
        }
    }
    run.await.unwrap();

    assert_eq!(
        events.last(),
        Some(&StreamEvent::Interrupt {
            message_id: "ai-msg-1".to_owned(),
            final_content: "one two ".to_owned(),
        })
    );
    assert_eq!(terminal_count(&events), 1);
    // No fragment after cancellation was emitted or persisted.
    assert_eq!(
        gateway.updates(),
        vec![Update {
            message_id: "ai-msg-1".to_owned(),
            content: "one two ".to_owned(),
            status: MessageStatus::Interrupted,
        }]
    );
}

#[tokio::test]
async fn client_disconnect_finalizes_as_interrupted() {
    let gateway = Arc::new(MemoryGateway::default());
    let (session, rx) = StreamSession::new(Arc::clone(&gateway), turn(), 1);
    // Client goes away before the first fragment.
    drop(rx);
    let source =
        Arc::new(ScriptedSource::new(["a", "b"]).with_delay(Duration::from_millis(50)));

    session.run(source, "hi".into(), "test-model".into()).await;

    let updates = gateway.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].status, MessageStatus::Interrupted);
}

// ── Error path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn source_failure_persists_partial_content_as_failed() {
    let gateway = Arc::new(MemoryGateway::default());
    let (session, rx) = StreamSession::new(Arc::clone(&gateway), turn(), 16);
    let source = Arc::new(ScriptedSource::new(["par", "tial"]).failing_after(1));

    session.run(source, "hi".into(), "test-model".into()).await;
    let events = collect_events(rx).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Chunk { .. }));
    assert!(matches!(events[1], StreamEvent::Error { .. }));
    assert_eq!(
        gateway.updates(),
        vec![Update {
            message_id: "ai-msg-1".to_owned(),
            content: "par".to_owned(),
            status: MessageStatus::Failed,
        }]
    );
}

#[tokio::test]
async fn source_failure_before_first_fragment() {
    let gateway = Arc::new(MemoryGateway::default());
    let (session, rx) = StreamSession::new(Arc::clone(&gateway), turn(), 16);
    let source = Arc::new(ScriptedSource::new(["never"]).failing_after(0));

    session.run(source, "hi".into(), "test-model".into()).await;
    let events = collect_events(rx).await;

    assert!(matches!(events.as_slice(), [StreamEvent::Error { .. }]));
    assert_eq!(gateway.updates()[0].status, MessageStatus::Failed);
    assert_eq!(gateway.updates()[0].content, "");
}

// ── Terminal exclusivity ──────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_first_terminal_operation_takes_effect() {
    let gateway = Arc::new(MemoryGateway::default());
    let (tx, rx) = mpsc::channel(16);
    let writer = StreamWriter::new(tx);
    let mut agg = ChunkAggregator::new(Arc::clone(&gateway), writer, turn());

    assert!(agg.on_fragment("x").await);
    agg.on_complete().await;
    agg.on_cancel().await;
    agg.on_source_error(&SourceError::Protocol("late".into())).await;
    agg.on_complete().await;
    assert_eq!(agg.content(), "x");

    let events = collect_events(rx).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], StreamEvent::Done);
    assert_eq!(terminal_count(&events), 1);
    assert_eq!(gateway.updates().len(), 1);
    assert_eq!(gateway.updates()[0].status, MessageStatus::Completed);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let gateway = Arc::new(MemoryGateway::default());
    let (tx, rx) = mpsc::channel(16);
    let writer = StreamWriter::new(tx);
    let mut agg = ChunkAggregator::new(Arc::clone(&gateway), writer, turn());

    agg.on_fragment("Par").await;
    agg.on_cancel().await;
    agg.on_cancel().await;

    let events = collect_events(rx).await;
    assert_eq!(terminal_count(&events), 1);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Interrupt {
            message_id: "ai-msg-1".to_owned(),
            final_content: "Par".to_owned(),
        })
    );
    assert_eq!(gateway.updates().len(), 1);
}
