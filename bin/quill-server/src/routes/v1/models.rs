//! Model catalog listing.

use std::sync::Arc;

use axum::Router;
use axum::Json;
use axum::routing::get;
use utoipa::OpenApi;

use crate::catalog;
use crate::schemas::v1::model::ModelInfo;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(list_models), components(schemas(ModelInfo)))]
pub struct ModelsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/models", get(list_models))
}

/// The selectable models (`GET /v1/models`).
#[utoipa::path(
    get,
    path = "/v1/models",
    tag = "models",
    responses(
        (status = 200, description = "Model catalog", body = Vec<ModelInfo>),
    )
)]
pub async fn list_models() -> Json<Vec<ModelInfo>> {
    Json(catalog::MODELS.iter().map(ModelInfo::from).collect())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn catalog_is_nonempty_and_typed() {
        let Json(models) = list_models().await;
        assert!(!models.is_empty());
        assert!(models.iter().all(|m| !m.id.is_empty()));
    }
}
