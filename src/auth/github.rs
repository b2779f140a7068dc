use reqwest::{Client, Url};
use serde::Deserialize;

const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Token exchange rejected: {0}")]
    ExchangeRejected(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// GitHub's user object, reduced to the fields this service keeps.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for the GitHub OAuth code flow: consent redirect, code exchange,
/// user fetch.
pub struct GithubClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    api_base: String,
}

impl GithubClient {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self::with_endpoints(
            client_id,
            client_secret,
            DEFAULT_AUTHORIZE_URL,
            DEFAULT_TOKEN_URL,
            DEFAULT_API_BASE,
        )
    }

    /// Endpoints are overridable so tests can point the client at a mock
    /// server.
    pub fn with_endpoints(
        client_id: &str,
        client_secret: &str,
        authorize_url: &str,
        token_url: &str,
        api_base: &str,
    ) -> Self {
        Self {
            http_client: Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authorize_url: authorize_url.to_string(),
            token_url: token_url.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// URL to send the browser to for the consent screen.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, GithubError> {
        Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", "read:user"),
                ("state", state),
            ],
        )
        .map(|url| url.to_string())
        .map_err(|e| GithubError::InvalidResponse(e.to_string()))
    }

    /// Trade the callback code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        let response: TokenResponse = self
            .http_client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| GithubError::RequestFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| GithubError::InvalidResponse(e.to_string()))?;

        match response.access_token {
            Some(token) => Ok(token),
            None => Err(GithubError::ExchangeRejected(
                response
                    .error_description
                    .or(response.error)
                    .unwrap_or_else(|| "no access token in reply".to_string()),
            )),
        }
    }

    /// Fetch the authenticated user behind an access token.
    pub async fn fetch_user(&self, access_token: &str) -> Result<GithubUser, GithubError> {
        self.http_client
            .get(format!("{}/user", self.api_base))
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("faction-badge/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| GithubError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| GithubError::RequestFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| GithubError::InvalidResponse(e.to_string()))
    }
}
