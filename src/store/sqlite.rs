use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{StoreError, UserStore};
use crate::models::user::{Faction, FactionStats, User};

/// Embedded SQLite backend. A single connection behind a mutex is enough at
/// this scale; every operation is one statement, so single-statement
/// atomicity covers the whole contract.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        // Accept both plain paths and sqlite: URLs
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                }
            }
        }

        let conn = Connection::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT UNIQUE,
                display_name TEXT NOT NULL,
                avatar_url TEXT,
                faction TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tracing::info!("SQLite store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
        let faction: Option<String> = row.get(4)?;
        let created_at: String = row.get(5)?;
        Ok(User {
            id: row.get(0)?,
            external_id: row.get(1)?,
            display_name: row.get(2)?,
            avatar_url: row.get(3)?,
            faction: faction.as_deref().and_then(Faction::parse),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, StoreError> {
        conn.query_row(
            "SELECT id, external_id, display_name, avatar_url, faction, created_at
             FROM users WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, external_id, display_name, avatar_url, faction, created_at
             FROM users WHERE external_id = ?1",
            params![external_id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        Self::get_user(&conn, id)
    }

    async fn create_or_update(
        &self,
        external_id: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, StoreError> {
        let conn = self.lock()?;

        let existing = conn
            .query_row(
                "SELECT id, external_id, display_name, avatar_url, faction, created_at
                 FROM users WHERE external_id = ?1",
                params![external_id],
                Self::row_to_user,
            )
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match existing {
            Some(user) => {
                conn.execute(
                    "UPDATE users SET display_name = ?1, avatar_url = ?2 WHERE id = ?3",
                    params![display_name, avatar_url, user.id],
                )
                .map_err(|e| StoreError::Backend(e.to_string()))?;

                Ok(User {
                    display_name: display_name.to_string(),
                    avatar_url: avatar_url.map(String::from),
                    ..user
                })
            }
            None => {
                let now = Utc::now();
                conn.execute(
                    "INSERT INTO users (external_id, display_name, avatar_url, faction, created_at)
                     VALUES (?1, ?2, ?3, NULL, ?4)",
                    params![external_id, display_name, avatar_url, now.to_rfc3339()],
                )
                .map_err(|e| StoreError::Backend(e.to_string()))?;

                let id = conn.last_insert_rowid();
                tracing::info!("Created user {} for external id {}", id, external_id);

                Ok(User {
                    id,
                    external_id: Some(external_id.to_string()),
                    display_name: display_name.to_string(),
                    avatar_url: avatar_url.map(String::from),
                    faction: None,
                    created_at: now,
                })
            }
        }
    }

    async fn create_guest(&self, display_name: &str) -> Result<User, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (external_id, display_name, avatar_url, faction, created_at)
             VALUES (NULL, ?1, NULL, NULL, ?2)",
            params![display_name, now.to_rfc3339()],
        )
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Created guest user {}", id);

        Ok(User {
            id,
            external_id: None,
            display_name: display_name.to_string(),
            avatar_url: None,
            faction: None,
            created_at: now,
        })
    }

    async fn set_faction(&self, id: i64, faction: Faction) -> Result<User, StoreError> {
        let conn = self.lock()?;

        let updated = conn
            .execute(
                "UPDATE users SET faction = ?1 WHERE id = ?2",
                params![faction.as_str(), id],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }

        Self::get_user(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    async fn get_faction(&self, id: i64) -> Result<Option<Faction>, StoreError> {
        let conn = self.lock()?;
        let faction: Option<Option<String>> = conn
            .query_row(
                "SELECT faction FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(faction
            .flatten()
            .as_deref()
            .and_then(Faction::parse))
    }

    async fn stats(&self) -> Result<FactionStats, StoreError> {
        let conn = self.lock()?;

        let count = |sql: &str| -> Result<u64, StoreError> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| StoreError::Backend(e.to_string()))
        };

        Ok(FactionStats {
            total_users: count("SELECT COUNT(*) FROM users")?,
            faction_a: count("SELECT COUNT(*) FROM users WHERE faction = 'A'")?,
            faction_b: count("SELECT COUNT(*) FROM users WHERE faction = 'B'")?,
            undecided: count("SELECT COUNT(*) FROM users WHERE faction IS NULL")?,
        })
    }
}
