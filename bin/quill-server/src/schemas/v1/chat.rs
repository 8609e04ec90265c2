//! Chat endpoint request / response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::message::MessageResponse;

/// Request body for `POST /v1/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    /// Existing chat to continue; omitted → a new chat is created lazily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// The user's message text.
    pub message: String,
    /// Owner of the chat.
    pub user_id: String,
    /// Catalog id of the model to generate with.
    pub model_id: String,
}

/// One chat in the `GET /v1/chats` listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryResponse {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    /// The chat's most recent message, when it has any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageResponse>,
}

/// Query string for `GET /v1/chats`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatsQuery {
    pub user_id: String,
}
