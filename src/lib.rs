pub mod config;
pub mod routes;
pub mod auth;
pub mod store;
pub mod models;
pub mod badge;
pub mod logging;
pub mod test_util;

pub use config::Config;
pub use auth::github::GithubClient;
pub use auth::session::{Identity, SessionCodec};
pub use models::user::{Faction, FactionStats, User, UserView};
pub use store::{StoreError, UserStore};

use std::sync::Arc;

/// Shared application state.
///
/// Every collaborator is constructed once in `main` and handed to the request
/// handlers through axum's `State`; nothing here is reachable as a global.
pub struct AppState {
    pub config: Config,
    /// Persistence backend, selected at startup by configuration.
    pub store: Arc<dyn UserStore>,
    /// Present only when GitHub OAuth credentials are configured; the login
    /// routes answer 501 without it.
    pub github: Option<GithubClient>,
    pub sessions: SessionCodec,
}
