//! User endpoint request / response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::UserRecord;

/// Response body for `GET /v1/users`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserRecord> for UserResponse {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

/// Query string for `GET /v1/users`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserQuery {
    pub email: String,
}
