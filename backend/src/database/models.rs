//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. The serialized form of [`Account`] is also the profile
//! payload returned to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub username: String,
    /// Stored as given. Never serialized to clients.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub auth_token: Option<String>,
    pub wins: i64,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert a new account. Counters start at zero.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub username: String,
    pub password: String,
    pub auth_token: String,
}
