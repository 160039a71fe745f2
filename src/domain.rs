/// Users and tokens as the rest of the service sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user. The password hash never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup payload; `password` is plaintext until `UserStore::insert` hashes it.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

/// Profile fields that may be changed in place.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// A persisted bearer token.
///
/// `plaintext` is only populated on the value returned at issuance; tokens read
/// back from the store carry the digest alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub id: i64,
    pub user_id: i64,
    pub email: String,
    #[serde(rename = "token", skip_serializing_if = "Option::is_none")]
    pub plaintext: Option<String>,
    #[serde(skip_serializing)]
    pub token_hash: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl Token {
    /// A token is valid strictly before its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

/// A freshly generated token that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub user_id: i64,
    pub plaintext: String,
    pub token_hash: Vec<u8>,
    pub expiry: DateTime<Utc>,
}
