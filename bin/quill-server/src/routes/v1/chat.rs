//! Streaming chat routes.
//!
//! `POST /v1/chat` turns one completion call into an SSE stream of
//! `chunk` / `interrupt` / `error` / `done` events.  All validation happens
//! before any durable state is created; the chat (when new), the user
//! message, and the `PENDING` assistant message are persisted before the
//! first token so the first chunk can carry their identifiers.  The actual
//! token pumping runs in a detached [`StreamSession`] so the response — and
//! its headers — are returned as soon as the records exist.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::Json;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use utoipa::OpenApi;

use quill_proto::{MessageStatus, Sender};
use quill_stream::{PersistenceGateway, StreamSession, TurnIds};

use crate::catalog;
use crate::db::{ChatStore, UserStore};
use crate::error::ServerError;
use crate::schemas::v1::chat::{ChatStreamRequest, ChatSummaryResponse, ChatsQuery};
use crate::schemas::v1::message::MessageResponse;
use crate::state::AppState;

/// Maximum allowed message length in bytes to prevent memory exhaustion.
const MAX_MESSAGE_BYTES: usize = 32 * 1024; // 32 KiB

#[derive(OpenApi)]
#[openapi(
    paths(stream_chat, list_chats),
    components(schemas(ChatStreamRequest, ChatSummaryResponse, MessageResponse))
)]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(stream_chat))
        .route("/chats", get(list_chats))
}

// ── Streaming endpoint ────────────────────────────────────────────────────────

/// Start one chat turn (`POST /v1/chat`).
///
/// The response body is a `text/event-stream`; see the wire protocol in
/// `quill-proto`.  Closing the connection cancels generation: the server
/// finalizes the assistant message as `INTERRUPTED` with everything produced
/// so far.
#[utoipa::path(
    post,
    path = "/v1/chat",
    tag = "chat",
    request_body = ChatStreamRequest,
    responses(
        (status = 200, description = "SSE stream of chat events"),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Unknown user or chat"),
    )
)]
pub async fn stream_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatStreamRequest>,
) -> Result<Response, ServerError> {
    let message = validate_request(&req)?;

    // The user must exist; identity bootstrap happens at /v1/users.
    let user = state
        .store
        .get_user(&req.user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("no such user: {}", req.user_id)))?;

    // Resolve the chat: reuse a supplied one (it must belong to the caller)
    // or create one lazily for this first message.
    let chat_id = match &req.chat_id {
        Some(id) => {
            let chat = state
                .store
                .get_chat(id)
                .await?
                .filter(|c| c.user_id == user.id)
                .ok_or_else(|| ServerError::NotFound(format!("no such chat: {id}")))?;
            chat.id
        }
        None => state.store.create_chat(&user.id).await?,
    };

    // Both messages exist before the first token so the first chunk can
    // carry their durable identifiers.
    let user_message_id = state
        .store
        .create_message(&chat_id, message, Sender::User, MessageStatus::Completed, None)
        .await?;
    let assistant_message_id = state
        .store
        .create_message(
            &chat_id,
            "",
            Sender::Ai,
            MessageStatus::Pending,
            Some(&req.model_id),
        )
        .await?;

    debug!(
        chat_id = %chat_id,
        model = %req.model_id,
        backend = state.backend.kind(),
        message_len = message.len(),
        "starting chat stream"
    );

    let turn = TurnIds {
        chat_id,
        user_message_id,
        assistant_message_id,
    };
    let (session, frame_rx) =
        StreamSession::new(Arc::clone(&state.store), turn, state.config.channel_capacity);
    tokio::spawn(session.run(
        Arc::clone(&state.backend),
        message.to_owned(),
        req.model_id.clone(),
    ));

    let body = Body::from_stream(ReceiverStream::new(frame_rx).map(Ok::<_, Infallible>));
    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .map_err(|e| ServerError::Internal(format!("failed to build SSE response: {e}")))?;
    Ok(response.into_response())
}

/// Synchronous request validation; nothing durable is created past a failure
/// here.  Returns the trimmed message text.
fn validate_request(req: &ChatStreamRequest) -> Result<&str, ServerError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ServerError::BadRequest("message must not be empty".into()));
    }
    if message.len() > MAX_MESSAGE_BYTES {
        return Err(ServerError::BadRequest(format!(
            "message too large ({} bytes); maximum is {} bytes",
            message.len(),
            MAX_MESSAGE_BYTES,
        )));
    }
    if req.user_id.is_empty() {
        return Err(ServerError::BadRequest("userId is required".into()));
    }
    if catalog::find(&req.model_id).is_none() {
        return Err(ServerError::BadRequest(format!(
            "unknown model: {}",
            req.model_id
        )));
    }
    Ok(message)
}

// ── Chat listing ──────────────────────────────────────────────────────────────

/// List a user's chats, newest first (`GET /v1/chats?userId=`).
#[utoipa::path(
    get,
    path = "/v1/chats",
    tag = "chat",
    params(("userId" = String, Query, description = "Owner of the chats")),
    responses(
        (status = 200, description = "Chat list retrieved", body = Vec<ChatSummaryResponse>),
    )
)]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatsQuery>,
) -> Result<Json<Vec<ChatSummaryResponse>>, ServerError> {
    let chats = state.store.list_chats(&query.user_id).await?;
    Ok(Json(
        chats
            .into_iter()
            .map(|(chat, latest)| ChatSummaryResponse {
                id: chat.id,
                user_id: chat.user_id,
                created_at: chat.created_at.to_rfc3339(),
                last_message: latest.map(MessageResponse::from),
            })
            .collect(),
    ))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    fn request(message: &str) -> ChatStreamRequest {
        ChatStreamRequest {
            chat_id: None,
            message: message.to_owned(),
            user_id: "user-1".to_owned(),
            model_id: "gpt-4o-mini".to_owned(),
        }
    }

    #[test]
    fn empty_message_is_rejected() {
        assert!(matches!(
            validate_request(&request("   ")),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn oversized_message_is_rejected() {
        let req = request(&"x".repeat(MAX_MESSAGE_BYTES + 1));
        assert!(matches!(
            validate_request(&req),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn unknown_model_is_rejected() {
        let req = ChatStreamRequest {
            model_id: "gpt-12-ultra".to_owned(),
            ..request("hello")
        };
        assert!(matches!(
            validate_request(&req),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn missing_user_is_rejected() {
        let req = ChatStreamRequest {
            user_id: String::new(),
            ..request("hello")
        };
        assert!(matches!(
            validate_request(&req),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn valid_request_returns_trimmed_message() {
        let req = request("  hello  ");
        assert_eq!(validate_request(&req).unwrap(), "hello");
    }
}
