//! Module for core business logic services.
//!
//! This module encapsulates the account directory, which owns the
//! credential and session workflow, and the client used to announce this
//! instance to the service registry.

pub mod account_directory;
pub mod registry_client;
