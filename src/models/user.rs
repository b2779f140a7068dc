use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two factions a user can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    A,
    B,
}

impl Faction {
    /// Strict parse for the JSON API and stored values: exactly "A" or "B".
    pub fn parse(raw: &str) -> Option<Faction> {
        match raw {
            "A" => Some(Faction::A),
            "B" => Some(Faction::B),
            _ => None,
        }
    }

    /// Lenient parse for badge URL tokens: case-insensitive letters plus the
    /// numeric aliases 1 and 2. Distinct from `parse` on purpose; the two
    /// rules serve different callers and must stay separate.
    pub fn from_token(raw: &str) -> Option<Faction> {
        match raw.to_ascii_lowercase().as_str() {
            "a" | "1" => Some(Faction::A),
            "b" | "2" => Some(Faction::B),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Faction::A => "A",
            Faction::B => "B",
        }
    }
}

/// User record, either authenticated (has an external id) or guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Store-allocated identifier, never reused.
    pub id: i64,
    /// GitHub user id as a string; None for guests.
    pub external_id: Option<String>,
    /// GitHub login, or "Guest" for anonymous identities.
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// None until the user picks a side.
    pub faction: Option<Faction>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_guest(&self) -> bool {
        self.external_id.is_none()
    }
}

/// JSON shape of a user as exposed by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub faction: Option<Faction>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            faction: user.faction,
        }
    }
}

/// Aggregate counts for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionStats {
    pub total_users: u64,
    pub faction_a: u64,
    pub faction_b: u64,
    pub undecided: u64,
}
