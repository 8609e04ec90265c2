pub mod chat;
pub mod messages;
pub mod models;
pub mod star;
pub mod users;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Routes nested under `/v1`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::router())
        .merge(messages::router())
        .merge(star::router())
        .merge(users::router())
        .merge(models::router())
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = V1Api::openapi();
    spec.merge(chat::ChatApi::openapi());
    spec.merge(messages::MessagesApi::openapi());
    spec.merge(star::StarApi::openapi());
    spec.merge(users::UsersApi::openapi());
    spec.merge(models::ModelsApi::openapi());
    spec
}
