/// Credential Store
///
/// The narrow persistence seam the auth core talks to: point lookups and
/// writes keyed by user id, unique email, or token digest. Backends must use
/// parameterized statements only.

mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{NewToken, Token, User, UserUpdate};
use crate::error::{AppError, DatabaseError};

pub use memory::InMemoryCredentialStore;
pub use postgres::{connect_pool, PgCredentialStore};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// All users, ordered by last name.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Insert a user whose password is already hashed; returns the new id.
    async fn insert_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<i64, AppError>;

    async fn update_user(&self, id: i64, changes: &UserUpdate) -> Result<(), AppError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError>;

    /// Delete a user together with any tokens they own.
    async fn delete_user(&self, id: i64) -> Result<(), AppError>;

    async fn find_token_by_hash(&self, token_hash: &[u8]) -> Result<Option<Token>, AppError>;

    /// Drop every token owned by `token.user_id` and store `token` in their place.
    async fn replace_user_token(&self, token: &NewToken, email: &str) -> Result<Token, AppError>;

    /// Deleting a digest that is not stored is not an error.
    async fn delete_token_by_hash(&self, token_hash: &[u8]) -> Result<(), AppError>;
}

/// Run a store operation under `limit`, surfacing overruns as `DatabaseError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Database(DatabaseError::Timeout(limit.as_millis()))),
    }
}
