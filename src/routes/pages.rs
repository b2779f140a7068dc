use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use crate::AppState;

/// Serve the entry page with caching disabled so a deploy shows up on the
/// next refresh. Everything else under the asset directory goes through
/// ServeDir with its defaults.
async fn index(State(state): State<Arc<AppState>>) -> Response {
    let path = std::path::Path::new(&state.config.static_files.dir).join("index.html");
    match tokio::fs::read(&path).await {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-store, max-age=0"),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.config.static_files.dir);
    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .fallback_service(assets)
        .with_state(state)
}
