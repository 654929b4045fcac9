//! Database repository for account persistence.
//!
//! Defines the [`AccountStore`] boundary used by the account directory and
//! its SQLite implementation. Every lookup reports a missing row as
//! [`StoreError::NotFound`] and a duplicate username as
//! [`StoreError::UniqueViolation`].

use crate::database::models::{Account, CreateAccount};
use crate::errors::StoreError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed find/create/update operations over account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// First account whose username and password both match exactly.
    async fn find_by_credentials(&self, username: &str, password: &str) -> StoreResult<Account>;

    /// The account holding `username`.
    async fn find_by_username(&self, username: &str) -> StoreResult<Account>;

    /// The account whose stored token and id both match.
    async fn find_by_session(&self, auth_token: &str, id: i64) -> StoreResult<Account>;

    /// Inserts a new account and returns it with its assigned id.
    async fn create(&self, account: CreateAccount) -> StoreResult<Account>;

    /// Overwrites the session token of account `id`.
    async fn update_token(&self, id: i64, auth_token: &str) -> StoreResult<()>;
}

const ACCOUNT_COLUMNS: &str =
    "id, username, password, auth_token, wins, attempts, created_at, updated_at";

/// SQLite-backed account store.
///
/// Uniqueness of usernames is enforced by the `UNIQUE` constraint on
/// `accounts.username`.
#[derive(Clone)]
pub struct AccountRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository instance.
    ///
    /// # Arguments
    /// * `pool` - SQLite connection pool; clones share the same connections
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_by_credentials(&self, username: &str, password: &str) -> StoreResult<Account> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ? AND password = ? ORDER BY id LIMIT 1"
        );
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .bind(password)
            .fetch_optional(&self.pool)
            .await?;

        account.ok_or(StoreError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Account> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ? ORDER BY id LIMIT 1");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        account.ok_or(StoreError::NotFound)
    }

    async fn find_by_session(&self, auth_token: &str, id: i64) -> StoreResult<Account> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE auth_token = ? AND id = ? LIMIT 1");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(auth_token)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        account.ok_or(StoreError::NotFound)
    }

    async fn create(&self, account: CreateAccount) -> StoreResult<Account> {
        let query = format!(
            r#"
            INSERT INTO accounts (username, password, auth_token, wins, attempts)
            VALUES (?, ?, ?, 0, 0)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Account>(&query)
            .bind(&account.username)
            .bind(&account.password)
            .bind(&account.auth_token)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn update_token(&self, id: i64, auth_token: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET auth_token = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(auth_token)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
