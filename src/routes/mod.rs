pub mod health;
pub mod auth;
pub mod api;
pub mod badge;
pub mod pages;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Assemble the full application router. Static assets are the fallback, so
/// unknown paths end as asset lookups (and 404s) rather than handler errors.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .merge(auth::router(state.clone()))
        .merge(api::router(state.clone()))
        .merge(badge::router(state.clone()))
        .merge(pages::router(state))
}
