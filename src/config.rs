use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 8080)
    pub port: u16,
    /// Public base URL used for OAuth redirects (default: http://localhost:8080)
    pub base_url: String,
    pub github: GithubConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
    pub static_files: StaticConfig,
}

/// GitHub OAuth application credentials. Both fields must be present for the
/// login flow to be offered; otherwise the service runs guest-only.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded SQLite file (default).
    Sqlite,
    /// Remote Redis-compatible REST endpoint.
    Kv,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// SQLite path (default: ./data/factions.db)
    pub url: String,
    /// KV REST endpoint, required when backend = kv.
    pub kv_url: Option<String>,
    /// KV bearer token, required when backend = kv.
    pub kv_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC secret for session cookies.
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct StaticConfig {
    /// Directory of static front-end assets (default: public)
    pub dir: String,
}

/// Fallback session secret for local development. Startup logs a warning when
/// it is in use.
pub const DEV_SESSION_SECRET: &str = "dev-session-secret";

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "sqlite".to_string())
            .as_str()
        {
            "sqlite" => StoreBackend::Sqlite,
            "kv" => StoreBackend::Kv,
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let database = DatabaseConfig {
            backend,
            url: env::var("DATABASE_URL").unwrap_or_else(|_| "./data/factions.db".to_string()),
            kv_url: env::var("KV_REST_URL").ok(),
            kv_token: env::var("KV_REST_TOKEN").ok(),
        };

        if backend == StoreBackend::Kv && (database.kv_url.is_none() || database.kv_token.is_none())
        {
            return Err(ConfigError::MissingEnvVar("KV_REST_URL / KV_REST_TOKEN"));
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            github: GithubConfig {
                client_id: env::var("GITHUB_CLIENT_ID").ok(),
                client_secret: env::var("GITHUB_CLIENT_SECRET").ok(),
            },
            database,
            session: SessionConfig {
                secret: env::var("SESSION_SECRET")
                    .unwrap_or_else(|_| DEV_SESSION_SECRET.to_string()),
            },
            logging: LoggingConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            static_files: StaticConfig {
                dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Unknown store backend: {0}")]
    UnknownBackend(String),
}
