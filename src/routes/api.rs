use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::session::{resolve_identity, Identity};
use crate::models::user::{Faction, UserView};
use crate::AppState;

/// Attach the freshly minted session cookie, when there is one.
fn with_session_cookie(identity: &Identity, body: Json<serde_json::Value>) -> Response {
    match &identity.set_cookie {
        Some(cookie) => ([(header::SET_COOKIE, cookie.clone())], body).into_response(),
        None => body.into_response(),
    }
}

fn store_failure(message: &'static str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"ok": false, "error": message})),
    )
        .into_response()
}

/// GET /api/me - the acting identity. Mints a guest on first contact, so
/// every caller leaves with a bound user.
async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let identity = match resolve_identity(state.store.as_ref(), &state.sessions, &headers).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("Failed to resolve identity: {}", e);
            return store_failure("Failed to resolve identity");
        }
    };

    let body = Json(json!({
        "authenticated": identity.authenticated,
        "user": UserView::from(&identity.user),
    }));
    with_session_cookie(&identity, body)
}

/// GET /api/config - what the front-end needs to decide whether to offer the
/// login button.
async fn config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "githubConfigured": state.github.is_some(),
        "baseUrl": state.config.base_url,
    }))
}

/// GET /api/stats - faction counts across all users.
async fn stats(State(state): State<Arc<AppState>>) -> Response {
    match state.store.stats().await {
        Ok(stats) => Json(json!({"ok": true, "stats": stats})).into_response(),
        Err(e) => {
            tracing::error!("Failed to get stats: {}", e);
            store_failure("Failed to get stats")
        }
    }
}

#[derive(Debug, Deserialize)]
struct FactionRequest {
    #[serde(default)]
    faction: Option<String>,
}

/// POST /api/faction - pick a side. Strictly "A" or "B": the lenient
/// lowercase/numeric spellings belong to the badge URLs, not this API.
async fn assign_faction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<FactionRequest>,
) -> Response {
    let Some(faction) = request.faction.as_deref().and_then(Faction::parse) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": "Faction must be \"A\" or \"B\""})),
        )
            .into_response();
    };

    let identity = match resolve_identity(state.store.as_ref(), &state.sessions, &headers).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("Failed to resolve identity: {}", e);
            return store_failure("Failed to resolve identity");
        }
    };

    match state.store.set_faction(identity.user.id, faction).await {
        Ok(user) => {
            let body = Json(json!({"ok": true, "user": UserView::from(&user)}));
            with_session_cookie(&identity, body)
        }
        Err(e) => {
            tracing::error!("Failed to set faction for user {}: {}", identity.user.id, e);
            store_failure("Failed to set faction")
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/config", get(config))
        .route("/api/stats", get(stats))
        .route("/api/faction", post(assign_faction))
        .with_state(state)
}
