//! Star endpoint request / response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::message::MessageResponse;

/// Request body for `POST /v1/star`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StarRequest {
    pub message_id: String,
    pub user_id: String,
    /// `true` to star, `false` to unstar.
    pub starred: bool,
}

/// One entry in the `GET /v1/starred` listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StarredMessageResponse {
    pub message_id: String,
    /// When the star was created.
    pub starred_at: String,
    pub message: MessageResponse,
}

/// Query string for `GET /v1/starred`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StarredQuery {
    pub user_id: String,
}
