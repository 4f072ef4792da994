use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Stored record, also the JSON shape returned by every users endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub password: String,
    pub email: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Request body for POST and PUT. Missing fields decode as empty strings,
// so a PUT that omits a field clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserPayload {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub password: String,
    pub email: String,
    pub country: String,
}

// Full record shape as a client may send it. Server-owned fields must still
// have the right type when present, but their values are discarded.
#[derive(Debug, Deserialize)]
struct IncomingUser {
    #[serde(flatten)]
    payload: UserPayload,
    #[allow(dead_code)]
    #[serde(default)]
    id: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[allow(dead_code)]
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl UserPayload {
    /// Decodes a POST/PUT body. A JSON `null` body decodes as an empty payload.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let incoming: Option<IncomingUser> = serde_json::from_slice(body)?;
        Ok(incoming.map(|user| user.payload).unwrap_or_default())
    }
}

impl User {
    pub fn from_payload(
        id: String,
        payload: UserPayload,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            first_name: payload.first_name,
            last_name: payload.last_name,
            nickname: payload.nickname,
            password: payload.password,
            email: payload.email,
            country: payload.country,
            created_at,
            updated_at,
        }
    }

    pub fn country_matches(&self, filter: &str) -> bool {
        filter.is_empty() || self.country.to_lowercase() == filter.to_lowercase()
    }
}

// Raw query values for GET /users; numbers are parsed leniently by the store
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub country: Option<String>,
}

impl UserListQuery {
    /// Builds the query from decoded key/value pairs. A repeated key keeps
    /// its first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "pageSize" => &mut query.page_size,
                "country" => &mut query.country,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub total: usize,
    pub users: Vec<User>,
}
