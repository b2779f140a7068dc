//! Shared fixtures for unit and integration tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::github::GithubClient;
use crate::auth::session::SessionCodec;
use crate::config::{
    Config, DatabaseConfig, GithubConfig, LoggingConfig, SessionConfig, StaticConfig, StoreBackend,
};
use crate::models::user::{Faction, FactionStats, User};
use crate::store::{SqliteStore, StoreError, UserStore};
use crate::AppState;

pub const TEST_SESSION_SECRET: &str = "test-session-secret";

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        base_url: "http://localhost:8080".to_string(),
        github: GithubConfig {
            client_id: None,
            client_secret: None,
        },
        database: DatabaseConfig {
            backend: StoreBackend::Sqlite,
            url: ":memory:".to_string(),
            kv_url: None,
            kv_token: None,
        },
        session: SessionConfig {
            secret: TEST_SESSION_SECRET.to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        static_files: StaticConfig {
            dir: "public".to_string(),
        },
    }
}

/// State over a fresh in-memory store, no OAuth.
pub fn create_test_state() -> Arc<AppState> {
    test_state_with_store(Arc::new(SqliteStore::open(":memory:").unwrap()))
}

pub fn test_state_with_store(store: Arc<dyn UserStore>) -> Arc<AppState> {
    let config = test_config();
    let sessions = SessionCodec::new(&config.session.secret);
    Arc::new(AppState {
        config,
        store,
        github: None,
        sessions,
    })
}

/// State with a GitHub client, typically pointed at a wiremock server.
pub fn test_state_with_github(github: GithubClient) -> Arc<AppState> {
    let config = test_config();
    let sessions = SessionCodec::new(&config.session.secret);
    Arc::new(AppState {
        config,
        store: Arc::new(SqliteStore::open(":memory:").unwrap()),
        github: Some(github),
        sessions,
    })
}

/// Store double whose every call fails, for exercising 500 paths.
pub struct FailingStore;

#[async_trait]
impl UserStore for FailingStore {
    async fn find_by_external_id(&self, _external_id: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Backend("injected failure".to_string()))
    }

    async fn find_by_id(&self, _id: i64) -> Result<Option<User>, StoreError> {
        Err(StoreError::Backend("injected failure".to_string()))
    }

    async fn create_or_update(
        &self,
        _external_id: &str,
        _display_name: &str,
        _avatar_url: Option<&str>,
    ) -> Result<User, StoreError> {
        Err(StoreError::Backend("injected failure".to_string()))
    }

    async fn create_guest(&self, _display_name: &str) -> Result<User, StoreError> {
        Err(StoreError::Backend("injected failure".to_string()))
    }

    async fn set_faction(&self, _id: i64, _faction: Faction) -> Result<User, StoreError> {
        Err(StoreError::Backend("injected failure".to_string()))
    }

    async fn get_faction(&self, _id: i64) -> Result<Option<Faction>, StoreError> {
        Err(StoreError::Backend("injected failure".to_string()))
    }

    async fn stats(&self) -> Result<FactionStats, StoreError> {
        Err(StoreError::Backend("injected failure".to_string()))
    }
}
