//! Identity bootstrap: find-or-create a user by email.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::Json;
use axum::routing::get;
use utoipa::OpenApi;

use crate::db::UserStore;
use crate::error::ServerError;
use crate::schemas::v1::user::{UserQuery, UserResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_or_create_user), components(schemas(UserResponse)))]
pub struct UsersApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/users", get(get_or_create_user))
}

/// Look a user up by email, creating one on first sight
/// (`GET /v1/users?email=`).  This is the entire identity story;
/// authentication is out of scope.
#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "users",
    params(("email" = String, Query, description = "Email to look up")),
    responses(
        (status = 200, description = "User found or created", body = UserResponse),
        (status = 400, description = "Invalid email"),
    )
)]
pub async fn get_or_create_user(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<UserResponse>, ServerError> {
    let email = query.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ServerError::BadRequest("a valid email is required".into()));
    }
    let user = state.store.find_or_create_user(email).await?;
    Ok(Json(user.into()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::db::sqlite::SqliteStore;
    use crate::state::ModelBackend;

    async fn state() -> Arc<AppState> {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let config = Config::from_env();
        let backend = ModelBackend::from_config(&config);
        Arc::new(AppState {
            config: Arc::new(config),
            store: Arc::new(store),
            backend: Arc::new(backend),
        })
    }

    #[tokio::test]
    async fn lookup_creates_then_reuses() {
        let state = state().await;
        let query = || {
            Query(UserQuery {
                email: "a@example.com".to_owned(),
            })
        };
        let Json(first) = get_or_create_user(State(Arc::clone(&state)), query())
            .await
            .unwrap();
        let Json(second) = get_or_create_user(State(state), query()).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let state = state().await;
        let err = get_or_create_user(
            State(state),
            Query(UserQuery {
                email: "not-an-email".to_owned(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }
}
