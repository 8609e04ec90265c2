//! Typed HTTP client for the quill server.

use serde::{Deserialize, Serialize};

use quill_proto::{MessageStatus, Sender};

use crate::error::ClientError;
use crate::reducer::TranscriptMessage;

/// A user as returned by `GET /v1/users`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One transcript message as returned by the JSON endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    pub id: String,
    pub chat_id: String,
    pub sender: Sender,
    pub content: String,
    pub status: MessageStatus,
    #[serde(default)]
    pub model: Option<String>,
    pub created_at: String,
}

impl From<ApiMessage> for TranscriptMessage {
    fn from(m: ApiMessage) -> Self {
        TranscriptMessage {
            id: m.id,
            chat_id: m.chat_id,
            sender: m.sender,
            content: m.content,
            status: m.status,
            model: m.model,
        }
    }
}

/// One chat in the `GET /v1/chats` listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    #[serde(default)]
    pub last_message: Option<ApiMessage>,
}

/// One entry in the `GET /v1/starred` listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarredMessage {
    pub message_id: String,
    pub starred_at: String,
    pub message: ApiMessage,
}

/// One selectable model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
}

/// Request body for `POST /v1/chat`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub message: String,
    pub user_id: String,
    pub model_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StarBody<'a> {
    message_id: &'a str,
    user_id: &'a str,
    starred: bool,
}

/// Thin typed wrapper over the server's HTTP surface.
///
/// All identity and model selection is explicit parameters; the client keeps
/// no ambient session state.
#[derive(Debug, Clone)]
pub struct QuillClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuillClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Find-or-create a user by email.
    pub async fn login(&self, email: &str) -> Result<User, ClientError> {
        let response = self
            .http
            .get(format!("{}/v1/users", self.base_url))
            .query(&[("email", email)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// The server's model catalog.
    pub async fn models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        let response = self
            .http
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Chats for a user, newest first.
    pub async fn chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, ClientError> {
        let response = self
            .http
            .get(format!("{}/v1/chats", self.base_url))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Ordered transcript of a chat.
    pub async fn messages(&self, chat_id: &str) -> Result<Vec<ApiMessage>, ClientError> {
        let response = self
            .http
            .get(format!("{}/v1/messages", self.base_url))
            .query(&[("chatId", chat_id)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Star (`starred = true`) or unstar a message.
    pub async fn set_star(
        &self,
        message_id: &str,
        user_id: &str,
        starred: bool,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/star", self.base_url))
            .json(&StarBody {
                message_id,
                user_id,
                starred,
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Starred messages for a user.
    pub async fn starred(&self, user_id: &str) -> Result<Vec<StarredMessage>, ClientError> {
        let response = self
            .http
            .get(format!("{}/v1/starred", self.base_url))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Start a chat turn; the returned response body is the event stream for
    /// [`crate::reader::read_stream`].
    pub async fn start_chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/chat", self.base_url))
            .json(request)
            .send()
            .await?;
        check(response).await
    }
}

/// Map non-success statuses to [`ClientError::Api`], extracting the server's
/// `{"error": ...}` body when present.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_owned))
        .unwrap_or(body);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn api_message_deserializes_wire_shape() {
        let json = r#"{
            "id": "m1",
            "chatId": "c1",
            "sender": "AI",
            "content": "hello",
            "status": "COMPLETED",
            "model": "gpt-4o-mini",
            "createdAt": "2026-01-01T00:00:00+00:00"
        }"#;
        let message: ApiMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.sender, Sender::Ai);
        assert_eq!(message.status, MessageStatus::Completed);
        assert_eq!(message.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn chat_request_serializes_camel_case_and_omits_absent_chat() {
        let request = ChatRequest {
            chat_id: None,
            message: "hi".to_owned(),
            user_id: "u1".to_owned(),
            model_id: "gpt-4".to_owned(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("chatId").is_none());
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["modelId"], "gpt-4");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = QuillClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }
}
