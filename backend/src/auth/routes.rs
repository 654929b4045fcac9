//! Defines the HTTP routes for authentication.
//!
//! These routes handle login, registration and the session-protected
//! profile lookup. They are designed to be integrated into the main Axum
//! router, which must provide the `AccountDirectory` as an extension.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/user", get(user).layer(middleware::from_fn(session_auth)))
}
