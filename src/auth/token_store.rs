/// Token Persistence
///
/// Looks tokens up by the digest of a presented plaintext and enforces one
/// stored token per user. Every call is bounded by the store timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::token::hash_token;
use crate::domain::{NewToken, Token, User};
use crate::error::AppError;
use crate::store::{with_timeout, CredentialStore};

#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl TokenStore {
    pub fn new(store: Arc<dyn CredentialStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Find the stored token whose digest matches `plaintext`.
    pub async fn find_by_plaintext(&self, plaintext: &str) -> Result<Option<Token>, AppError> {
        let token_hash = hash_token(plaintext);
        with_timeout(self.timeout, self.store.find_token_by_hash(&token_hash)).await
    }

    /// The user that owns `token`, if they still exist.
    pub async fn find_user_for_token(&self, token: &Token) -> Result<Option<User>, AppError> {
        with_timeout(self.timeout, self.store.find_user_by_id(token.user_id)).await
    }

    /// Persist `token` for `owner`, superseding whatever token they had.
    ///
    /// The stored email is taken from `owner` at this moment. Holders of the
    /// superseded token are not notified; their next lookup simply misses.
    pub async fn save(&self, token: NewToken, owner: &User) -> Result<Token, AppError> {
        if token.user_id != owner.id {
            return Err(AppError::Internal(format!(
                "token for user {} saved against user {}",
                token.user_id, owner.id
            )));
        }

        let mut stored = with_timeout(
            self.timeout,
            self.store.replace_user_token(&token, &owner.email),
        )
        .await?;

        stored.plaintext = Some(token.plaintext);
        Ok(stored)
    }

    /// Remove the token matching `plaintext`. Unknown tokens are ignored.
    pub async fn delete_by_plaintext(&self, plaintext: &str) -> Result<(), AppError> {
        let token_hash = hash_token(plaintext);
        with_timeout(self.timeout, self.store.delete_token_by_hash(&token_hash)).await
    }
}
