//! Data structures for authentication requests and responses.
//!
//! Field names follow the JSON wire format expected by existing clients
//! (`authToken`, `id`, `success`).

use crate::services::account_directory::{AuthOutcome, SessionGrant};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request payload. Values are opaque and not length-checked.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Registration request payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Response to login and registration.
///
/// A failed login carries only `success: false`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl LoginResponse {
    pub fn failed() -> Self {
        Self {
            success: false,
            auth_token: None,
            id: None,
        }
    }
}

impl From<SessionGrant> for LoginResponse {
    fn from(grant: SessionGrant) -> Self {
        Self {
            success: true,
            auth_token: Some(grant.auth_token),
            id: Some(grant.id),
        }
    }
}

impl From<AuthOutcome> for LoginResponse {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Authenticated(grant) => grant.into(),
            AuthOutcome::NotMatched => Self::failed(),
        }
    }
}

/// Session credentials presented out-of-band on profile requests.
#[derive(Debug, Clone, Validate)]
pub struct SessionQuery {
    #[validate(length(min = 1, message = "Missing Authorization header"))]
    pub auth_token: String,

    #[validate(length(min = 1, message = "Missing X-User-ID header"))]
    pub user_id: String,
}
