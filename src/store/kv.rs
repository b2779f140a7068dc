use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{StoreError, UserStore};
use crate::models::user::{Faction, FactionStats, User};

/// Remote key-value backend speaking the Upstash-style Redis REST protocol:
/// each command is POSTed as a JSON array and the reply is `{"result": ...}`
/// or `{"error": ...}`.
///
/// Key families:
/// - `user:<id>` holds the JSON-encoded record,
/// - `extid:<external_id>` holds the id behind that external id, standing in
///   for the relational unique index,
/// - `seq:user` is the id allocator, bumped with atomic INCR.
pub struct KvStore {
    http_client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct KvReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl KvStore {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn command(&self, cmd: Value) -> Result<Value, StoreError> {
        let reply: KvReply = self
            .http_client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&cmd)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .json()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(error) = reply.error {
            return Err(StoreError::Backend(error));
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }

    async fn get_record(&self, id: i64) -> Result<Option<User>, StoreError> {
        match self.command(json!(["GET", format!("user:{}", id)])).await? {
            Value::String(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| StoreError::Backend(e.to_string())),
            _ => Ok(None),
        }
    }

    async fn put_record(&self, user: &User) -> Result<(), StoreError> {
        let body =
            serde_json::to_string(user).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.command(json!(["SET", format!("user:{}", user.id), body]))
            .await?;
        Ok(())
    }

    async fn next_id(&self) -> Result<i64, StoreError> {
        self.command(json!(["INCR", "seq:user"]))
            .await?
            .as_i64()
            .ok_or_else(|| StoreError::Backend("non-numeric INCR reply".to_string()))
    }
}

#[async_trait]
impl UserStore for KvStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        let id = match self
            .command(json!(["GET", format!("extid:{}", external_id)]))
            .await?
        {
            Value::String(raw) => raw
                .parse::<i64>()
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| StoreError::Backend("non-integer id in index".to_string()))?,
            _ => return Ok(None),
        };
        self.get_record(id).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.get_record(id).await
    }

    async fn create_or_update(
        &self,
        external_id: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, StoreError> {
        if let Some(mut user) = self.find_by_external_id(external_id).await? {
            user.display_name = display_name.to_string();
            user.avatar_url = avatar_url.map(String::from);
            self.put_record(&user).await?;
            return Ok(user);
        }

        let user = User {
            id: self.next_id().await?,
            external_id: Some(external_id.to_string()),
            display_name: display_name.to_string(),
            avatar_url: avatar_url.map(String::from),
            faction: None,
            created_at: Utc::now(),
        };
        self.put_record(&user).await?;
        self.command(json!([
            "SET",
            format!("extid:{}", external_id),
            user.id.to_string()
        ]))
        .await?;

        tracing::info!("Created user {} for external id {}", user.id, external_id);
        Ok(user)
    }

    async fn create_guest(&self, display_name: &str) -> Result<User, StoreError> {
        let user = User {
            id: self.next_id().await?,
            external_id: None,
            display_name: display_name.to_string(),
            avatar_url: None,
            faction: None,
            created_at: Utc::now(),
        };
        self.put_record(&user).await?;

        tracing::debug!("Created guest user {}", user.id);
        Ok(user)
    }

    async fn set_faction(&self, id: i64, faction: Faction) -> Result<User, StoreError> {
        let mut user = self.get_record(id).await?.ok_or(StoreError::NotFound(id))?;
        user.faction = Some(faction);
        self.put_record(&user).await?;
        Ok(user)
    }

    async fn get_faction(&self, id: i64) -> Result<Option<Faction>, StoreError> {
        Ok(self.get_record(id).await?.and_then(|user| user.faction))
    }

    async fn stats(&self) -> Result<FactionStats, StoreError> {
        let mut stats = FactionStats {
            total_users: 0,
            faction_a: 0,
            faction_b: 0,
            undecided: 0,
        };

        // SCAN the user:* key family in pages, then MGET each page
        let mut cursor = "0".to_string();
        loop {
            let reply = self
                .command(json!(["SCAN", cursor, "MATCH", "user:*", "COUNT", "100"]))
                .await?;
            let parts = reply.as_array().cloned().unwrap_or_default();

            cursor = match parts.first() {
                Some(Value::String(next)) => next.clone(),
                Some(Value::Number(next)) => next.to_string(),
                _ => "0".to_string(),
            };

            let keys: Vec<Value> = parts
                .get(1)
                .and_then(Value::as_array)
                .map(|keys| keys.iter().filter(|k| k.is_string()).cloned().collect())
                .unwrap_or_default();

            if !keys.is_empty() {
                let mut cmd = vec![Value::from("MGET")];
                cmd.extend(keys);
                let records = self.command(Value::Array(cmd)).await?;

                for record in records.as_array().into_iter().flatten() {
                    let Some(body) = record.as_str() else { continue };
                    let Ok(user) = serde_json::from_str::<User>(body) else {
                        continue;
                    };
                    stats.total_users += 1;
                    match user.faction {
                        Some(Faction::A) => stats.faction_a += 1,
                        Some(Faction::B) => stats.faction_b += 1,
                        None => stats.undecided += 1,
                    }
                }
            }

            if cursor == "0" {
                break;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json(id: i64, faction: Option<Faction>) -> String {
        serde_json::to_string(&User {
            id,
            external_id: Some("42".to_string()),
            display_name: "octocat".to_string(),
            avatar_url: None,
            faction,
            created_at: Utc::now(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_guest_allocates_from_counter() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("INCR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 7})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("SET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
            .mount(&server)
            .await;

        let store = KvStore::new(&server.uri(), "test-token");
        let guest = store.create_guest("Guest").await.unwrap();

        assert_eq!(guest.id, 7);
        assert_eq!(guest.display_name, "Guest");
        assert!(guest.external_id.is_none());
        assert!(guest.faction.is_none());
    }

    #[tokio::test]
    async fn test_find_by_external_id_follows_index() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("extid:42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "7"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("user:7"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": user_json(7, Some(Faction::B))})),
            )
            .mount(&server)
            .await;

        let store = KvStore::new(&server.uri(), "test-token");
        let user = store.find_by_external_id("42").await.unwrap().unwrap();

        assert_eq!(user.id, 7);
        assert_eq!(user.faction, Some(Faction::B));
    }

    #[tokio::test]
    async fn test_missing_keys_resolve_to_none() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
            .mount(&server)
            .await;

        let store = KvStore::new(&server.uri(), "test-token");
        assert!(store.find_by_id(9).await.unwrap().is_none());
        assert!(store.find_by_external_id("9").await.unwrap().is_none());
        assert!(store.get_faction(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_faction_missing_user_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
            .mount(&server)
            .await;

        let store = KvStore::new(&server.uri(), "test-token");
        let result = store.set_faction(9, Faction::A).await;
        assert!(matches!(result, Err(StoreError::NotFound(9))));
    }

    #[tokio::test]
    async fn test_error_reply_surfaces_as_backend_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "WRONGPASS"})),
            )
            .mount(&server)
            .await;

        let store = KvStore::new(&server.uri(), "test-token");
        match store.find_by_id(1).await {
            Err(StoreError::Backend(message)) => assert!(message.contains("WRONGPASS")),
            other => panic!("expected backend error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_stats_walks_scan_pages() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("SCAN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"result": ["0", ["user:1", "user:2", "user:3"]]}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("MGET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": [
                user_json(1, Some(Faction::A)),
                user_json(2, Some(Faction::B)),
                user_json(3, None),
            ]})))
            .mount(&server)
            .await;

        let store = KvStore::new(&server.uri(), "test-token");
        let stats = store.stats().await.unwrap();

        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.faction_a, 1);
        assert_eq!(stats.faction_b, 1);
        assert_eq!(stats.undecided, 1);
    }
}
