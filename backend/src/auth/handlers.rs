//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for login, registration
//! and profile lookup, parse request data and delegate to the
//! `AccountDirectory` for the core account logic.

use crate::api::common::{error_body, service_error_to_http};
use crate::auth::models::*;
use crate::database::models::Account;
use crate::services::account_directory::AccountDirectory;
use axum::{
    extract::{Extension, Json, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Handle user login request
///
/// Unknown credentials are answered with `200 {"success": false}`.
#[axum::debug_handler]
pub async fn login(
    Extension(directory): Extension<Arc<AccountDirectory>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ResponseJson<LoginResponse>, (StatusCode, String)> {
    let Json(payload) = payload.map_err(bad_body)?;
    info!(username = %payload.username, "Received login request");

    match directory
        .authenticate(&payload.username, &payload.password)
        .await
    {
        Ok(outcome) => Ok(ResponseJson(outcome.into())),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle account registration request
#[axum::debug_handler]
pub async fn register(
    Extension(directory): Extension<Arc<AccountDirectory>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, ResponseJson<LoginResponse>), (StatusCode, String)> {
    let Json(payload) = payload.map_err(bad_body)?;
    info!(username = %payload.username, "Received register request");

    match directory
        .register(&payload.username, &payload.password)
        .await
    {
        Ok(grant) => Ok((StatusCode::CREATED, ResponseJson(grant.into()))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Get the account behind the session resolved by `session_auth`
#[axum::debug_handler]
pub async fn user(Extension(account): Extension<Account>) -> ResponseJson<Account> {
    ResponseJson(account)
}

fn bad_body(rejection: JsonRejection) -> (StatusCode, String) {
    warn!(error = %rejection, "Rejected request body");
    (
        StatusCode::BAD_REQUEST,
        error_body(rejection.body_text(), "invalid_request_body"),
    )
}
