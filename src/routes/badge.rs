use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::badge;
use crate::models::user::Faction;
use crate::AppState;

/// SVG response with caching disabled, so a faction switch shows up
/// immediately wherever the badge is embedded.
fn svg_response(body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/svg+xml; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store, max-age=0"),
        ],
        body,
    )
        .into_response()
}

fn trim_svg(segment: &str) -> &str {
    segment.strip_suffix(".svg").unwrap_or(segment)
}

/// Faction behind a user id; unknown users and store failures render as
/// unset rather than erroring, badges are best-effort.
async fn faction_for_id(state: &AppState, id: i64) -> Option<Faction> {
    match state.store.get_faction(id).await {
        Ok(faction) => faction,
        Err(e) => {
            tracing::warn!("Badge lookup failed for user {}: {}", id, e);
            None
        }
    }
}

async fn faction_for_id_token(state: &AppState, token: &str) -> Option<Faction> {
    match trim_svg(token).parse::<i64>() {
        Ok(id) => faction_for_id(state, id).await,
        Err(_) => None,
    }
}

#[derive(Debug, Deserialize)]
struct BadgeQuery {
    faction: Option<String>,
    f: Option<String>,
    id: Option<String>,
}

impl BadgeQuery {
    /// Resolution rules shared by /badge and /image: an explicit faction
    /// token wins, then a user id lookup, then unset.
    async fn resolve(&self, state: &AppState) -> Option<Faction> {
        if let Some(token) = self.faction.as_deref().or(self.f.as_deref()) {
            return Faction::from_token(trim_svg(token));
        }
        match &self.id {
            Some(id) => faction_for_id_token(state, id).await,
            None => None,
        }
    }
}

async fn badge_by_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BadgeQuery>,
) -> Response {
    svg_response(badge::badge(query.resolve(&state).await))
}

async fn badge_by_id(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    svg_response(badge::badge(faction_for_id_token(&state, &id).await))
}

async fn badge_by_faction(Path(token): Path<String>) -> Response {
    svg_response(badge::badge(Faction::from_token(trim_svg(&token))))
}

async fn card_by_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BadgeQuery>,
) -> Response {
    svg_response(badge::card(query.resolve(&state).await))
}

async fn card_by_id(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    svg_response(badge::card(faction_for_id_token(&state, &id).await))
}

async fn card_by_faction(Path(token): Path<String>) -> Response {
    svg_response(badge::card(Faction::from_token(trim_svg(&token))))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/badge", get(badge_by_query))
        .route("/badge/:id", get(badge_by_id))
        .route("/badge/faction/:f", get(badge_by_faction))
        .route("/image", get(card_by_query))
        .route("/image/:id", get(card_by_id))
        .route("/image/faction/:f", get(card_by_faction))
        .with_state(state)
}
