use serde::Serialize;
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
}

/// Row to insert; `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Caller-supplied user id, always bound as a query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupId {
    Int(i64),
    Text(String),
}

impl From<i64> for LookupId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for LookupId {
    fn from(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(id) => Self::Int(id),
            Err(_) => Self::Text(raw.to_owned()),
        }
    }
}

impl std::fmt::Display for LookupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(raw) => write!(f, "{raw:?}"),
        }
    }
}
