//! Authentication module for login, registration and session lookup.
//!
//! This module provides the HTTP interface over the account directory:
//! request/response models, handlers, the session middleware and routes.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
