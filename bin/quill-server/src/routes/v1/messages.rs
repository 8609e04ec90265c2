//! Transcript listing.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::Json;
use axum::routing::get;
use utoipa::OpenApi;

use crate::db::MessageStore;
use crate::error::ServerError;
use crate::schemas::v1::message::{MessageResponse, MessagesQuery};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(list_messages), components(schemas(MessageResponse)))]
pub struct MessagesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/messages", get(list_messages))
}

/// Ordered transcript of a chat (`GET /v1/messages?chatId=`).
///
/// Messages come back oldest first, the order the reducer on the client
/// maintains.  A `PENDING` assistant message means a stream is (or was)
/// in flight for this chat.
#[utoipa::path(
    get,
    path = "/v1/messages",
    tag = "messages",
    params(("chatId" = String, Query, description = "Chat to list")),
    responses(
        (status = 200, description = "Messages retrieved", body = Vec<MessageResponse>),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let messages = state.store.list_messages(&query.chat_id).await?;
    Ok(Json(
        messages.into_iter().map(MessageResponse::from).collect(),
    ))
}
