//! Durable-storage boundary consumed by the pipeline.
//!
//! The gateway is the sole writer of durable chat state.  The pipeline calls
//! it at checkpoints only — record creation before streaming begins, and the
//! final content/status flush on a terminal event — never per fragment, which
//! bounds write amplification at the cost of the durable record lagging the
//! live stream until the turn ends.
//!
//! The server crate implements this trait over its SQLite store; pipeline
//! tests use an in-memory recording implementation.  Methods use
//! `impl Future` signatures so no extra async-trait machinery is needed.

use std::future::Future;

use quill_proto::{MessageStatus, Sender};

pub trait PersistenceGateway: Send + Sync + 'static {
    /// Create a new chat owned by `user_id` and return its id.
    fn create_chat(&self, user_id: &str) -> impl Future<Output = anyhow::Result<String>> + Send;

    /// Create a message row and return its id.
    fn create_message(
        &self,
        chat_id: &str,
        content: &str,
        sender: Sender,
        status: MessageStatus,
        model: Option<&str>,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;

    /// Overwrite a message's content and status.
    fn update_message(
        &self,
        message_id: &str,
        content: &str,
        status: MessageStatus,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
