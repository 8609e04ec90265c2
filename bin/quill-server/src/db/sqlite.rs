//! SQLite implementation of the store traits.
//!
//! Uses [`sqlx`] with the `sqlite` feature.  Migrations are run automatically
//! on startup via [`SqliteStore::connect`]; `sqlx::migrate!("./migrations")`
//! resolves the path at compile time relative to the crate root, so the
//! directory is embedded into the binary.
//!
//! The `sqlx::query` (runtime-verified) form is used deliberately so that no
//! `DATABASE_URL` environment variable is needed at compile time.  Timestamps
//! are stored as RFC 3339 TEXT and parsed back leniently: a corrupt value is
//! logged and replaced with "now" rather than failing the whole query.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use quill_proto::{MessageStatus, Sender};
use quill_stream::PersistenceGateway;

use super::{
    ChatRecord, ChatStore, MessageRecord, MessageStore, StarRecord, StarStore, UserRecord,
    UserStore,
};

/// SQLite-backed store for users, chats, messages and stars.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending
    /// migrations.  `url` is a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://quill.db"` or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let mut pool_options = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            // Every pooled connection to :memory: gets its own database, so
            // the pool must hold exactly one connection and never recycle it.
            pool_options = pool_options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

type MessageRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
);

fn decode_message(row: MessageRow) -> Result<MessageRecord, sqlx::Error> {
    let (id, chat_id, sender, content, status, model, created_at) = row;
    Ok(MessageRecord {
        id,
        chat_id,
        sender: sender
            .parse::<Sender>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        content,
        status: status
            .parse::<MessageStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        model,
        created_at: parse_timestamp(&created_at),
    })
}

// ── UserStore ─────────────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
    async fn find_or_create_user(&self, email: &str) -> Result<UserRecord, sqlx::Error> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, email, created_at, updated_at FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id, email, created_at, updated_at)) = row {
            return Ok(UserRecord {
                id,
                email,
                created_at: parse_timestamp(&created_at),
                updated_at: parse_timestamp(&updated_at),
            });
        }

        let user = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO users (id, email, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, email, created_at, updated_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, email, created_at, updated_at)| UserRecord {
            id,
            email,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        }))
    }
}

// ── ChatStore ─────────────────────────────────────────────────────────────────

impl ChatStore for SqliteStore {
    async fn insert_chat(&self, chat: ChatRecord) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO chats (id, user_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(&chat.id)
            .bind(&chat.user_id)
            .bind(chat.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_chat(&self, id: &str) -> Result<Option<ChatRecord>, sqlx::Error> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, user_id, created_at FROM chats WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, user_id, created_at)| ChatRecord {
            id,
            user_id,
            created_at: parse_timestamp(&created_at),
        }))
    }

    async fn list_chats(
        &self,
        user_id: &str,
    ) -> Result<Vec<(ChatRecord, Option<MessageRecord>)>, sqlx::Error> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT id, user_id, created_at FROM chats \
             WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut chats = Vec::with_capacity(rows.len());
        for (id, user_id, created_at) in rows {
            let latest: Option<MessageRow> = sqlx::query_as(
                "SELECT id, chat_id, sender, content, status, model, created_at \
                 FROM messages WHERE chat_id = ?1 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(&id)
            .fetch_optional(&self.pool)
            .await?;
            let latest = latest.map(decode_message).transpose()?;
            chats.push((
                ChatRecord {
                    id,
                    user_id,
                    created_at: parse_timestamp(&created_at),
                },
                latest,
            ));
        }
        Ok(chats)
    }
}

// ── MessageStore ──────────────────────────────────────────────────────────────

impl MessageStore for SqliteStore {
    async fn insert_message(&self, message: MessageRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender, content, status, model, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&message.id)
        .bind(&message.chat_id)
        .bind(message.sender.to_string())
        .bind(&message.content)
        .bind(message.status.to_string())
        .bind(&message.model)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<MessageRecord>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, chat_id, sender, content, status, model, created_at \
             FROM messages WHERE chat_id = ?1 ORDER BY created_at ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode_message).collect()
    }

    async fn update_message(
        &self,
        id: &str,
        content: &str,
        status: MessageStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE messages SET content = ?1, status = ?2 WHERE id = ?3")
            .bind(content)
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_message_owned(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> Result<Option<MessageRecord>, sqlx::Error> {
        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT m.id, m.chat_id, m.sender, m.content, m.status, m.model, m.created_at \
             FROM messages m JOIN chats c ON m.chat_id = c.id \
             WHERE m.id = ?1 AND c.user_id = ?2",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(decode_message).transpose()
    }
}

// ── StarStore ─────────────────────────────────────────────────────────────────

impl StarStore for SqliteStore {
    async fn insert_star(&self, star: StarRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO stars (id, user_id, message_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&star.id)
        .bind(&star.user_id)
        .bind(&star.message_id)
        .bind(star.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_star(&self, user_id: &str, message_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM stars WHERE user_id = ?1 AND message_id = ?2")
            .bind(user_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_starred(
        &self,
        user_id: &str,
    ) -> Result<Vec<(StarRecord, MessageRecord)>, sqlx::Error> {
        type StarredRow = (
            String,
            String,
            String,
            String,
            String,
            String,
            String,
            String,
            String,
            Option<String>,
            String,
        );
        let rows: Vec<StarredRow> = sqlx::query_as(
            "SELECT s.id, s.user_id, s.message_id, s.created_at, \
                    m.id, m.chat_id, m.sender, m.content, m.status, m.model, m.created_at \
             FROM stars s JOIN messages m ON s.message_id = m.id \
             WHERE s.user_id = ?1 ORDER BY s.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let (sid, s_user, s_msg, s_created, mid, chat_id, sender, content, status, model, m_created) =
                    row;
                let star = StarRecord {
                    id: sid,
                    user_id: s_user,
                    message_id: s_msg,
                    created_at: parse_timestamp(&s_created),
                };
                let message =
                    decode_message((mid, chat_id, sender, content, status, model, m_created))?;
                Ok((star, message))
            })
            .collect()
    }
}

// ── PersistenceGateway ────────────────────────────────────────────────────────

/// The streaming pipeline's storage boundary, backed by the same pool.
impl PersistenceGateway for SqliteStore {
    async fn create_chat(&self, user_id: &str) -> anyhow::Result<String> {
        let chat = ChatRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            created_at: Utc::now(),
        };
        self.insert_chat(chat.clone()).await?;
        Ok(chat.id)
    }

    async fn create_message(
        &self,
        chat_id: &str,
        content: &str,
        sender: Sender,
        status: MessageStatus,
        model: Option<&str>,
    ) -> anyhow::Result<String> {
        let message = MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.to_owned(),
            sender,
            content: content.to_owned(),
            status,
            model: model.map(str::to_owned),
            created_at: Utc::now(),
        };
        self.insert_message(message.clone()).await?;
        Ok(message.id)
    }

    async fn update_message(
        &self,
        message_id: &str,
        content: &str,
        status: MessageStatus,
    ) -> anyhow::Result<()> {
        MessageStore::update_message(self, message_id, content, status).await?;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
