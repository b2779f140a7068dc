use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::github::GithubClient;
use crate::auth::session::read_cookie;
use crate::AppState;

/// One-shot cookie carrying the OAuth state nonce across the redirect.
const STATE_COOKIE: &str = "oauth_state";

fn not_configured() -> Response {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({"error": "GitHub OAuth is not configured"})),
    )
        .into_response()
}

/// GET /auth/github - send the browser to GitHub's consent screen.
async fn login(State(state): State<Arc<AppState>>) -> Response {
    let Some(github) = &state.github else {
        return not_configured();
    };

    let redirect_uri = format!(
        "{}/auth/github/callback",
        state.config.base_url.trim_end_matches('/')
    );
    let nonce = Uuid::new_v4().to_string();

    let url = match github.authorize_url(&redirect_uri, &nonce) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Failed to build authorize URL: {}", e);
            return Redirect::to("/?auth=failed").into_response();
        }
    };

    let state_cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=600",
        STATE_COOKIE, nonce
    );
    ([(header::SET_COOKIE, state_cookie)], Redirect::to(&url)).into_response()
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// GET /auth/github/callback - finish the OAuth dance. Any failure past the
/// configuration check sends the browser back to the front page with a flag
/// instead of showing an error body.
async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(github) = &state.github else {
        return not_configured();
    };

    match complete_login(&state, github, &headers, query).await {
        Ok(session_cookie) => {
            ([(header::SET_COOKIE, session_cookie)], Redirect::to("/")).into_response()
        }
        Err(reason) => {
            tracing::warn!("GitHub login failed: {}", reason);
            Redirect::to("/?auth=failed").into_response()
        }
    }
}

async fn complete_login(
    state: &AppState,
    github: &GithubClient,
    headers: &HeaderMap,
    query: CallbackQuery,
) -> Result<String, String> {
    let code = query.code.ok_or("missing code parameter")?;
    let returned_state = query.state.ok_or("missing state parameter")?;
    let expected = read_cookie(headers, STATE_COOKIE).ok_or("missing state cookie")?;
    if returned_state != expected {
        return Err("state mismatch".to_string());
    }

    let token = github.exchange_code(&code).await.map_err(|e| e.to_string())?;
    let gh_user = github.fetch_user(&token).await.map_err(|e| e.to_string())?;

    let user = state
        .store
        .create_or_update(
            &gh_user.id.to_string(),
            &gh_user.login,
            gh_user.avatar_url.as_deref(),
        )
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!("GitHub login for {} (user {})", gh_user.login, user.id);
    Ok(state.sessions.issue_cookie(user.id, true))
}

/// POST /logout - drop the session cookie. The user record stays; a guest
/// minted on the next request starts over.
async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Json(json!({"ok": true})),
    )
        .into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/github", get(login))
        .route("/auth/github/callback", get(callback))
        .route("/logout", post(logout))
        .with_state(state)
}
