pub mod sqlite;
pub mod kv;

pub use kv::KvStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::models::user::{Faction, FactionStats, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found: {0}")]
    NotFound(i64),
    #[error("Store error: {0}")]
    Backend(String),
}

/// Backend-agnostic persistence contract for user records.
///
/// Invalid faction strings are unrepresentable here; textual validation
/// happens where text enters the system, before a `Faction` is constructed.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Insert a new user for `external_id`, or refresh `display_name` and
    /// `avatar_url` on the existing record. Re-authentication never creates
    /// a duplicate and never touches the stored faction.
    async fn create_or_update(
        &self,
        external_id: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, StoreError>;

    /// Insert a fresh record with no external id and no faction.
    async fn create_guest(&self, display_name: &str) -> Result<User, StoreError>;

    /// Write the faction on an existing record and return the updated user.
    async fn set_faction(&self, id: i64, faction: Faction) -> Result<User, StoreError>;

    /// `Ok(None)` both when the user does not exist and when they have not
    /// chosen yet; badge rendering treats the two the same.
    async fn get_faction(&self, id: i64) -> Result<Option<Faction>, StoreError>;

    async fn stats(&self) -> Result<FactionStats, StoreError>;
}

/// Open the store selected by configuration. Runs once at startup; handlers
/// get the resulting handle and never branch on the backend again.
pub fn connect(config: &DatabaseConfig) -> Result<Arc<dyn UserStore>, StoreError> {
    match config.backend {
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.url)?)),
        StoreBackend::Kv => {
            let url = config
                .kv_url
                .as_deref()
                .ok_or_else(|| StoreError::Backend("KV_REST_URL is not set".to_string()))?;
            let token = config
                .kv_token
                .as_deref()
                .ok_or_else(|| StoreError::Backend("KV_REST_TOKEN is not set".to_string()))?;
            Ok(Arc::new(KvStore::new(url, token)))
        }
    }
}
