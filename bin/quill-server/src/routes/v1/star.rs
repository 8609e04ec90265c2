//! Star toggle and starred-message listing.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::Json;
use axum::routing::{get, post};
use chrono::Utc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::db::{MessageStore, StarRecord, StarStore};
use crate::error::ServerError;
use crate::schemas::v1::message::MessageResponse;
use crate::schemas::v1::star::{StarRequest, StarredMessageResponse, StarredQuery};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(toggle_star, list_starred),
    components(schemas(StarRequest, StarredMessageResponse))
)]
pub struct StarApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/star", post(toggle_star))
        .route("/starred", get(list_starred))
}

/// Star or unstar a message (`POST /v1/star`).
///
/// The message must live in a chat owned by the caller.  At most one star
/// exists per (user, message) pair: starring twice is a 409, unstarring a
/// message that is not starred is a 404.
#[utoipa::path(
    post,
    path = "/v1/star",
    tag = "star",
    request_body = StarRequest,
    responses(
        (status = 200, description = "Star state updated"),
        (status = 404, description = "Message not found, not owned, or not starred"),
        (status = 409, description = "Message is already starred"),
    )
)]
pub async fn toggle_star(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StarRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if req.message_id.is_empty() || req.user_id.is_empty() {
        return Err(ServerError::BadRequest(
            "messageId and userId are required".into(),
        ));
    }

    // Ownership check doubles as the existence check.
    state
        .store
        .get_message_owned(&req.message_id, &req.user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("message not found".into()))?;

    if req.starred {
        let star = StarRecord {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id.clone(),
            message_id: req.message_id.clone(),
            created_at: Utc::now(),
        };
        state.store.insert_star(star).await.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ServerError::Conflict("message is already starred".into())
            }
            other => ServerError::Database(other),
        })?;
    } else if !state
        .store
        .delete_star(&req.user_id, &req.message_id)
        .await?
    {
        return Err(ServerError::NotFound("message is not starred".into()));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Starred messages for a user, newest star first (`GET /v1/starred?userId=`).
#[utoipa::path(
    get,
    path = "/v1/starred",
    tag = "star",
    params(("userId" = String, Query, description = "Owner of the stars")),
    responses(
        (status = 200, description = "Starred messages retrieved", body = Vec<StarredMessageResponse>),
    )
)]
pub async fn list_starred(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StarredQuery>,
) -> Result<Json<Vec<StarredMessageResponse>>, ServerError> {
    let starred = state.store.list_starred(&query.user_id).await?;
    Ok(Json(
        starred
            .into_iter()
            .map(|(star, message)| StarredMessageResponse {
                message_id: star.message_id,
                starred_at: star.created_at.to_rfc3339(),
                message: MessageResponse::from(message),
            })
            .collect(),
    ))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
