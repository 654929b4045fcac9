//! Global application error types and handlers.
//!
//! This module defines the error types used across the backend: the tagged
//! [`StoreError`] returned at the record store boundary and the generic
//! [`ServiceError`] surfaced by the service layer and mapped to HTTP responses.

use thiserror::Error;

/// Errors reported by the record store.
///
/// Callers branch on the variant, never on the message text.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matched the lookup.
    #[error("record not found")]
    NotFound,
    /// A write would have broken a uniqueness constraint.
    #[error("unique constraint violated")]
    UniqueViolation,
    /// Any other persistence failure.
    #[error("store backend error: {0}")]
    Backend(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => {
                StoreError::UniqueViolation
            }
            other => StoreError::Backend(other),
        }
    }
}

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("Database error: {source}")]
    Database {
        #[source]
        source: StoreError,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn database(source: StoreError) -> Self {
        Self::Database { source }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
