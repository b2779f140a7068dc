use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::User;
use crate::store::{StoreError, UserStore};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime. Guests keep their identity exactly as long as the
/// cookie lives; there is no server-side session table.
const SESSION_TTL_DAYS: i64 = 30;

/// Claims carried by the session cookie: the bound user id and whether the
/// binding came from a completed OAuth login.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: i64,
    authenticated: bool,
    exp: u64,
    iat: u64,
}

/// Signs and verifies session cookies: HS256 over the configured secret.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Set-Cookie value binding `user_id` to this browser.
    pub fn issue_cookie(&self, user_id: i64, authenticated: bool) -> String {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            authenticated,
            exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp() as u64,
            iat: now.timestamp() as u64,
        };
        // HS256 over an in-memory key; encoding these claims cannot fail
        let token = encode(&Header::default(), &claims, &self.encoding_key).unwrap_or_default();
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            SESSION_TTL_DAYS * 24 * 60 * 60
        )
    }

    /// Set-Cookie value that drops the session immediately.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
    }

    /// User id behind the request's session cookie, if any. Cookie-only,
    /// no store lookup; request logging tags lines with this.
    pub fn session_user_id(&self, headers: &HeaderMap) -> Option<i64> {
        self.verify(headers).map(|claims| claims.sub)
    }

    /// Decode the session cookie, if present and still valid. Expired or
    /// tampered cookies read as no session at all.
    fn verify(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let token = read_cookie(headers, SESSION_COOKIE)?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        decode::<SessionClaims>(&token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

/// Pull a named cookie value out of the request's Cookie header(s).
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key == name).then(|| val.to_string())
        })
}

/// The acting identity for a request, plus the cookie to attach to the
/// response when a new session was minted.
pub struct Identity {
    pub user: User,
    pub authenticated: bool,
    pub set_cookie: Option<String>,
}

/// Resolve a request to exactly one user record.
///
/// A valid cookie whose user still loads wins; a cookie pointing at a user
/// the store no longer has (store reset) falls through to guest creation.
/// Two concurrent first-contact requests from the same cookie-less browser
/// may each mint a guest; whichever Set-Cookie the browser keeps wins and
/// the other record is orphaned. Accepted as-is: sessions are
/// single-browser-tab in practice and records are never deleted anyway.
pub async fn resolve_identity(
    store: &dyn UserStore,
    sessions: &SessionCodec,
    headers: &HeaderMap,
) -> Result<Identity, StoreError> {
    if let Some(claims) = sessions.verify(headers) {
        if let Some(user) = store.find_by_id(claims.sub).await? {
            return Ok(Identity {
                user,
                authenticated: claims.authenticated,
                set_cookie: None,
            });
        }
        tracing::debug!(
            "Session cookie for missing user {}, minting a new guest",
            claims.sub
        );
    }

    let user = store.create_guest("Guest").await?;
    let set_cookie = sessions.issue_cookie(user.id, false);
    Ok(Identity {
        user,
        authenticated: false,
        set_cookie: Some(set_cookie),
    })
}
