//! Middleware for protecting session-authenticated routes.
//!
//! Reads the session token from the `Authorization` header and the account
//! id from `X-User-ID`, resolves them through the account directory and
//! exposes the matching [`Account`](crate::database::models::Account) to
//! handlers as a request extension.

use crate::api::common::service_error_to_http;
use crate::auth::models::SessionQuery;
use crate::services::account_directory::AccountDirectory;
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header carrying the account id alongside the session token.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Session authentication middleware
pub async fn session_auth(
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let directory = request
        .extensions()
        .get::<Arc<AccountDirectory>>()
        .cloned()
        .ok_or_else(|| {
            tracing::error!("Account directory missing from request extensions");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        })?;

    let query = session_query(request.headers());

    match directory.resolve_session(&query).await {
        Ok(account) => {
            request.extensions_mut().insert(account);
            Ok(next.run(request).await)
        }
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Builds the session query from request headers.
///
/// Missing or non-UTF-8 headers become empty strings and are rejected by
/// validation. A `Bearer ` prefix on the token is stripped.
fn session_query(headers: &HeaderMap) -> SessionQuery {
    let authorization = header_value(headers, AUTHORIZATION.as_str());
    let auth_token = authorization
        .strip_prefix("Bearer ")
        .unwrap_or(authorization)
        .trim();

    SessionQuery {
        auth_token: auth_token.to_string(),
        user_id: header_value(headers, USER_ID_HEADER).to_string(),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default()
}
