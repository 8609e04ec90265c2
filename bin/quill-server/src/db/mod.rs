//! Database abstraction layer.
//!
//! The store traits below define the persistence interface per aggregate:
//! [`UserStore`], [`ChatStore`], [`MessageStore`], [`StarStore`].  The default
//! implementation is [`sqlite::SqliteStore`].  To swap to another database,
//! implement the traits for a new type and change the concrete type in
//! [`crate::state::AppState`].
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

pub mod sqlite;

use std::future::Future;

use chrono::{DateTime, Utc};

use quill_proto::{MessageStatus, Sender};

/// A single row in the `users` table.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single row in the `chats` table.
#[derive(Debug, Clone)]
pub struct ChatRecord {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A single row in the `messages` table.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub chat_id: String,
    pub sender: Sender,
    pub content: String,
    pub status: MessageStatus,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single row in the `stars` table, joined with its message when listed.
#[derive(Debug, Clone)]
pub struct StarRecord {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub created_at: DateTime<Utc>,
}

pub trait UserStore: Send + Sync + 'static {
    /// Look a user up by email, creating one if absent.
    fn find_or_create_user(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<UserRecord, sqlx::Error>> + Send;

    fn get_user(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
}

pub trait ChatStore: Send + Sync + 'static {
    fn insert_chat(
        &self,
        chat: ChatRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn get_chat(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<ChatRecord>, sqlx::Error>> + Send;

    /// Chats for a user, newest first, each with its latest message.
    fn list_chats(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<(ChatRecord, Option<MessageRecord>)>, sqlx::Error>> + Send;
}

pub trait MessageStore: Send + Sync + 'static {
    fn insert_message(
        &self,
        message: MessageRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Ordered transcript of a chat, oldest first.
    fn list_messages(
        &self,
        chat_id: &str,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, sqlx::Error>> + Send;

    /// Overwrite content and status; used at stream checkpoints.
    fn update_message(
        &self,
        id: &str,
        content: &str,
        status: MessageStatus,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Fetch a message only if it lives in a chat owned by `user_id`.
    fn get_message_owned(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<MessageRecord>, sqlx::Error>> + Send;
}

pub trait StarStore: Send + Sync + 'static {
    /// Insert a star.  A duplicate (user, message) pair surfaces as the
    /// database's unique-constraint violation.
    fn insert_star(
        &self,
        star: StarRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Remove a star; returns `false` when no such star existed.
    fn delete_star(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    /// Starred messages for a user, newest star first.
    fn list_starred(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<(StarRecord, MessageRecord)>, sqlx::Error>> + Send;
}
