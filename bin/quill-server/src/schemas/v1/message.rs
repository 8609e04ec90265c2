//! Message response type shared by several endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::MessageRecord;

/// One transcript message as returned over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    /// `"USER"` or `"AI"`.
    pub sender: String,
    pub content: String,
    /// `"PENDING"`, `"COMPLETED"`, `"INTERRUPTED"` or `"FAILED"`.
    pub status: String,
    /// Model that produced an assistant message, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: String,
}

/// Query string for `GET /v1/messages`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub chat_id: String,
}

impl From<MessageRecord> for MessageResponse {
    fn from(m: MessageRecord) -> Self {
        Self {
            id: m.id,
            chat_id: m.chat_id,
            sender: m.sender.to_string(),
            content: m.content,
            status: m.status.to_string(),
            model: m.model,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}
