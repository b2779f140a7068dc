use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::config::StoreBackend;
use crate::AppState;

/// Liveness plus the two facts a deployment check cares about: which
/// persistence backend this process runs and whether login is offered.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: &'static str,
    github_login: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: match state.config.database.backend {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Kv => "kv",
        },
        github_login: state.github.is_some(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}
