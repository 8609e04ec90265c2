//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Reports the version and which token backend is active; monitoring should
/// poll this endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.backend.kind(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::db::sqlite::SqliteStore;
    use crate::state::ModelBackend;

    #[tokio::test]
    async fn health_reports_ok_and_backend() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let config = Config::from_env();
        let backend = ModelBackend::from_config(&config);
        let state = Arc::new(AppState {
            config: Arc::new(config),
            store: Arc::new(store),
            backend: Arc::new(backend),
        });

        let Json(body) = get_health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
        assert!(!body["backend"].as_str().unwrap_or("").is_empty());
    }
}
