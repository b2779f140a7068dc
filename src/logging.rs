use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Middleware logging one INFO line per handled request, tagged with the
/// session user when the request carries a valid session cookie. The tag
/// comes from the cookie alone; the logging path never touches the store.
pub async fn request_logger(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user = state
        .sessions
        .session_user_id(request.headers())
        .map_or_else(|| "-".to_string(), |id| id.to_string());

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        user = %user,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "request"
    );

    response
}
