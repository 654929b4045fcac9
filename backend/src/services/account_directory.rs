//! Account directory: credential verification, registration and sessions.
//!
//! Owns the account workflow on top of an injected [`AccountStore`] and
//! [`TokenGenerator`]. Every store error is classified here before it
//! reaches a caller: a missing record is a normal negative outcome, a
//! uniqueness violation is a conflict, and anything else is internal.

use crate::auth::models::SessionQuery;
use crate::database::models::{Account, CreateAccount};
use crate::errors::{ServiceError, ServiceResult, StoreError};
use crate::repositories::account_repository::AccountStore;
use crate::utils::token::TokenGenerator;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Token and id handed to a client after login or registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub id: i64,
    pub auth_token: String,
}

/// Result of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(SessionGrant),
    /// No account has this username/password pair.
    NotMatched,
}

/// Service layer for account and session operations.
pub struct AccountDirectory {
    store: Arc<dyn AccountStore>,
    tokens: Arc<dyn TokenGenerator>,
}

impl AccountDirectory {
    /// Creates a new AccountDirectory instance.
    ///
    /// # Arguments
    /// * `store` - Record store shared by all requests
    /// * `tokens` - Source of session tokens
    pub fn new(store: Arc<dyn AccountStore>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self { store, tokens }
    }

    /// Verifies a username/password pair and rotates the account's token.
    ///
    /// # Returns
    /// `AuthOutcome::Authenticated` with a freshly issued token, or
    /// `AuthOutcome::NotMatched` when no account matches.
    ///
    /// # Errors
    /// Returns `ServiceError` when the store or the randomness source fails.
    pub async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<AuthOutcome> {
        let account = match self.store.find_by_credentials(username, password).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                debug!(username, "Credentials did not match any account");
                return Ok(AuthOutcome::NotMatched);
            }
            Err(e) => {
                error!(username, error = %e, "Credential lookup failed");
                return Err(ServiceError::database(e));
            }
        };

        let auth_token = self.issue_token()?;
        self.update_token(account.id, &auth_token).await?;

        info!(account_id = account.id, "Account authenticated");
        Ok(AuthOutcome::Authenticated(SessionGrant {
            id: account.id,
            auth_token,
        }))
    }

    /// Creates an account for an unused username and issues its first token.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - `AlreadyExists` when the username is taken, including a registration
    ///   that loses a race against a concurrent one
    /// - `Database` when the existence check or the insert fails; creation is
    ///   never attempted after a failed existence check
    /// - `InternalError` when no token can be generated
    pub async fn register(&self, username: &str, password: &str) -> ServiceResult<SessionGrant> {
        match self.store.find_by_username(username).await {
            Ok(_) => {
                warn!(username, "Username already exists");
                return Err(ServiceError::already_exists("Account", username));
            }
            Err(StoreError::NotFound) => {}
            Err(e) => {
                error!(username, error = %e, "Error checking for existing account");
                return Err(ServiceError::database(e));
            }
        }

        let auth_token = self.issue_token()?;

        let data = CreateAccount {
            username: username.to_string(),
            password: password.to_string(),
            auth_token: auth_token.clone(),
        };

        let account = match self.store.create(data).await {
            Ok(account) => account,
            Err(StoreError::UniqueViolation) => {
                warn!(username, "Username claimed by a concurrent registration");
                return Err(ServiceError::already_exists("Account", username));
            }
            Err(e) => {
                error!(username, error = %e, "Error creating account");
                return Err(ServiceError::database(e));
            }
        };

        info!(account_id = account.id, username, "Account registered");
        Ok(SessionGrant {
            id: account.id,
            auth_token,
        })
    }

    /// Returns the account whose current token and id both match the query.
    ///
    /// # Errors
    /// - `Validation` when a field is missing or the id is not an integer;
    ///   the store is not consulted
    /// - `NotFound` when no account holds this token under this id
    /// - `Database` for any other store failure
    pub async fn resolve_session(&self, query: &SessionQuery) -> ServiceResult<Account> {
        if let Err(validation_errors) = query.validate() {
            return Err(ServiceError::validation(validation_message(
                &validation_errors,
            )));
        }

        let id = query
            .user_id
            .trim()
            .parse::<i64>()
            .map_err(|_| ServiceError::validation("Invalid userID"))?;

        match self.store.find_by_session(&query.auth_token, id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => {
                debug!(account_id = id, "No account for session token");
                Err(ServiceError::not_found("Account", id.to_string()))
            }
            Err(e) => {
                error!(account_id = id, error = %e, "Error finding account by session");
                Err(ServiceError::database(e))
            }
        }
    }

    /// Persists `auth_token` as the current token of account `id`.
    ///
    /// A vanished row is reported as a store failure, not as a missing account.
    async fn update_token(&self, id: i64, auth_token: &str) -> ServiceResult<()> {
        self.store.update_token(id, auth_token).await.map_err(|e| {
            error!(account_id = id, error = %e, "Error updating account token");
            ServiceError::database(e)
        })
    }

    fn issue_token(&self) -> ServiceResult<String> {
        self.tokens.generate().map_err(|e| {
            error!(error = %e, "Error generating auth token");
            ServiceError::internal_error(format!("Token generation failed: {}", e))
        })
    }
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    let error_messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect();
    error_messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::repositories::account_repository::{AccountRepository, StoreResult};
    use crate::utils::token::OsRngTokenGenerator;
    use crate::utils::token::testing::{FailingTokenGenerator, SequenceTokenGenerator};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn directory() -> AccountDirectory {
        let store = AccountRepository::new(test_pool().await);
        AccountDirectory::new(Arc::new(store), Arc::new(SequenceTokenGenerator::default()))
    }

    fn session(auth_token: &str, user_id: &str) -> SessionQuery {
        SessionQuery {
            auth_token: auth_token.to_string(),
            user_id: user_id.to_string(),
        }
    }

    fn granted(outcome: AuthOutcome) -> SessionGrant {
        match outcome {
            AuthOutcome::Authenticated(grant) => grant,
            AuthOutcome::NotMatched => panic!("expected successful authentication"),
        }
    }

    /// Store whose every call fails with a backend error.
    #[derive(Default)]
    struct UnavailableStore {
        create_called: AtomicBool,
    }

    fn unavailable() -> StoreError {
        StoreError::Backend(sqlx::Error::PoolTimedOut)
    }

    #[async_trait]
    impl AccountStore for UnavailableStore {
        async fn find_by_credentials(&self, _: &str, _: &str) -> StoreResult<Account> {
            Err(unavailable())
        }
        async fn find_by_username(&self, _: &str) -> StoreResult<Account> {
            Err(unavailable())
        }
        async fn find_by_session(&self, _: &str, _: i64) -> StoreResult<Account> {
            Err(unavailable())
        }
        async fn create(&self, _: CreateAccount) -> StoreResult<Account> {
            self.create_called.store(true, Ordering::SeqCst);
            Err(unavailable())
        }
        async fn update_token(&self, _: i64, _: &str) -> StoreResult<()> {
            Err(unavailable())
        }
    }

    /// Store that never sees an existing username, so only the UNIQUE
    /// constraint stands between two registrations.
    struct StaleReadStore {
        inner: AccountRepository,
    }

    #[async_trait]
    impl AccountStore for StaleReadStore {
        async fn find_by_credentials(&self, u: &str, p: &str) -> StoreResult<Account> {
            self.inner.find_by_credentials(u, p).await
        }
        async fn find_by_username(&self, _: &str) -> StoreResult<Account> {
            Err(StoreError::NotFound)
        }
        async fn find_by_session(&self, t: &str, id: i64) -> StoreResult<Account> {
            self.inner.find_by_session(t, id).await
        }
        async fn create(&self, account: CreateAccount) -> StoreResult<Account> {
            self.inner.create(account).await
        }
        async fn update_token(&self, id: i64, t: &str) -> StoreResult<()> {
            self.inner.update_token(id, t).await
        }
    }

    /// Store whose token writes fail after a successful credential lookup.
    struct ReadOnlyStore {
        inner: AccountRepository,
    }

    #[async_trait]
    impl AccountStore for ReadOnlyStore {
        async fn find_by_credentials(&self, u: &str, p: &str) -> StoreResult<Account> {
            self.inner.find_by_credentials(u, p).await
        }
        async fn find_by_username(&self, u: &str) -> StoreResult<Account> {
            self.inner.find_by_username(u).await
        }
        async fn find_by_session(&self, t: &str, id: i64) -> StoreResult<Account> {
            self.inner.find_by_session(t, id).await
        }
        async fn create(&self, account: CreateAccount) -> StoreResult<Account> {
            self.inner.create(account).await
        }
        async fn update_token(&self, _: i64, _: &str) -> StoreResult<()> {
            Err(unavailable())
        }
    }

    #[tokio::test]
    async fn test_end_to_end_session_lifecycle() {
        let directory = directory().await;

        let registered = directory.register("alice", "secret").await.unwrap();
        assert_eq!(registered.id, 1);
        let t1 = registered.auth_token;

        let login = granted(directory.authenticate("alice", "secret").await.unwrap());
        assert_eq!(login.id, 1);
        let t2 = login.auth_token;
        assert_ne!(t1, t2);

        let account = directory.resolve_session(&session(&t2, "1")).await.unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.auth_token.as_deref(), Some(t2.as_str()));
        assert_eq!(account.wins, 0);
        assert_eq!(account.attempts, 0);

        let stale = directory.resolve_session(&session(&t1, "1")).await;
        assert!(matches!(stale, Err(ServiceError::NotFound { .. })));

        let again = directory.register("alice", "other").await;
        assert!(matches!(again, Err(ServiceError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let directory = directory().await;
        directory.register("bob", "pw").await.unwrap();

        let result = directory.register("bob", "pw").await;
        assert!(matches!(result, Err(ServiceError::AlreadyExists { .. })));

        // The first account is untouched.
        let login = directory.authenticate("bob", "pw").await.unwrap();
        assert_eq!(granted(login).id, 1);
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password_is_not_matched() {
        let directory = directory().await;
        directory.register("alice", "secret").await.unwrap();

        let outcome = directory.authenticate("alice", "wrong").await.unwrap();
        assert_eq!(outcome, AuthOutcome::NotMatched);

        let outcome = directory.authenticate("nobody", "secret").await.unwrap();
        assert_eq!(outcome, AuthOutcome::NotMatched);
    }

    #[tokio::test]
    async fn test_authenticate_returns_the_matching_account_id() {
        let directory = directory().await;
        directory.register("alice", "a").await.unwrap();
        let bob = directory.register("bob", "b").await.unwrap();

        let login = granted(directory.authenticate("bob", "b").await.unwrap());
        assert_eq!(login.id, bob.id);
    }

    #[tokio::test]
    async fn test_accepts_empty_credentials() {
        let directory = directory().await;

        let grant = directory.register("", "").await.unwrap();
        let login = granted(directory.authenticate("", "").await.unwrap());
        assert_eq!(login.id, grant.id);
    }

    #[tokio::test]
    async fn test_resolve_session_requires_both_fields_to_match() {
        let directory = directory().await;
        let alice = directory.register("alice", "a").await.unwrap();
        let bob = directory.register("bob", "b").await.unwrap();

        let wrong_id = directory
            .resolve_session(&session(&alice.auth_token, &bob.id.to_string()))
            .await;
        assert!(matches!(wrong_id, Err(ServiceError::NotFound { .. })));

        let wrong_token = directory
            .resolve_session(&session(&bob.auth_token, &alice.id.to_string()))
            .await;
        assert!(matches!(wrong_token, Err(ServiceError::NotFound { .. })));

        let ok = directory
            .resolve_session(&session(&bob.auth_token, &bob.id.to_string()))
            .await
            .unwrap();
        assert_eq!(ok.username, "bob");
    }

    #[tokio::test]
    async fn test_resolve_session_rejects_malformed_input_before_store() {
        let directory = AccountDirectory::new(
            Arc::new(UnavailableStore::default()),
            Arc::new(SequenceTokenGenerator::default()),
        );

        for query in [
            session("", "1"),
            session("token-1", ""),
            session("token-1", "abc"),
            session("token-1", "1.5"),
        ] {
            let result = directory.resolve_session(&query).await;
            assert!(
                matches!(result, Err(ServiceError::Validation { .. })),
                "query {:?} should be invalid",
                query
            );
        }
    }

    #[tokio::test]
    async fn test_register_fails_closed_when_existence_check_errors() {
        let store = Arc::new(UnavailableStore::default());
        let directory =
            AccountDirectory::new(store.clone(), Arc::new(SequenceTokenGenerator::default()));

        let result = directory.register("alice", "secret").await;

        assert!(matches!(result, Err(ServiceError::Database { .. })));
        assert!(!store.create_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_store_failures_are_internal_not_negative_outcomes() {
        let directory = AccountDirectory::new(
            Arc::new(UnavailableStore::default()),
            Arc::new(SequenceTokenGenerator::default()),
        );

        let login = directory.authenticate("alice", "secret").await;
        assert!(matches!(login, Err(ServiceError::Database { .. })));

        let lookup = directory.resolve_session(&session("token-1", "1")).await;
        assert!(matches!(lookup, Err(ServiceError::Database { .. })));
    }

    #[tokio::test]
    async fn test_token_write_failure_is_internal() {
        let inner = AccountRepository::new(test_pool().await);
        let setup =
            AccountDirectory::new(Arc::new(inner.clone()), Arc::new(SequenceTokenGenerator::default()));
        setup.register("alice", "secret").await.unwrap();

        let directory = AccountDirectory::new(
            Arc::new(ReadOnlyStore { inner }),
            Arc::new(SequenceTokenGenerator::default()),
        );
        let result = directory.authenticate("alice", "secret").await;

        assert!(matches!(result, Err(ServiceError::Database { .. })));
    }

    #[tokio::test]
    async fn test_token_generation_failure_is_internal() {
        let inner = AccountRepository::new(test_pool().await);
        let setup =
            AccountDirectory::new(Arc::new(inner.clone()), Arc::new(SequenceTokenGenerator::default()));
        setup.register("alice", "secret").await.unwrap();

        let directory = AccountDirectory::new(Arc::new(inner), Arc::new(FailingTokenGenerator));

        let login = directory.authenticate("alice", "secret").await;
        assert!(matches!(login, Err(ServiceError::InternalError { .. })));

        let register = directory.register("carol", "pw").await;
        assert!(matches!(register, Err(ServiceError::InternalError { .. })));

        // A bad password is still a plain mismatch, not a token failure.
        let mismatch = directory.authenticate("alice", "wrong").await.unwrap();
        assert_eq!(mismatch, AuthOutcome::NotMatched);
    }

    #[tokio::test]
    async fn test_successive_logins_rotate_random_tokens() {
        let store = AccountRepository::new(test_pool().await);
        let directory = AccountDirectory::new(Arc::new(store), Arc::new(OsRngTokenGenerator));
        directory.register("alice", "secret").await.unwrap();

        let first = granted(directory.authenticate("alice", "secret").await.unwrap());
        let second = granted(directory.authenticate("alice", "secret").await.unwrap());

        assert_eq!(first.auth_token.len(), 64);
        assert_ne!(first.auth_token, second.auth_token);

        let superseded = directory
            .resolve_session(&session(&first.auth_token, "1"))
            .await;
        assert!(matches!(superseded, Err(ServiceError::NotFound { .. })));
        assert!(
            directory
                .resolve_session(&session(&second.auth_token, "1"))
                .await
                .is_ok()
        );
    }

    async fn register_concurrently(directory: Arc<AccountDirectory>, n: usize) -> (usize, usize) {
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let directory = directory.clone();
                tokio::spawn(async move {
                    directory
                        .register("mallory", &format!("password-{}", i))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for result in futures::future::join_all(handles).await {
            match result.unwrap() {
                Ok(_) => successes += 1,
                Err(ServiceError::AlreadyExists { .. }) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        (successes, conflicts)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_yield_one_success() {
        for n in [2, 8, 32] {
            let directory = Arc::new(directory().await);

            let (successes, conflicts) = register_concurrently(directory, n).await;

            assert_eq!(successes, 1, "n = {}", n);
            assert_eq!(conflicts, n - 1, "n = {}", n);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unique_constraint_catches_lost_race() {
        let inner = AccountRepository::new(test_pool().await);
        let directory = Arc::new(AccountDirectory::new(
            Arc::new(StaleReadStore { inner }),
            Arc::new(SequenceTokenGenerator::default()),
        ));

        let (successes, conflicts) = register_concurrently(directory, 16).await;

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);
    }
}
