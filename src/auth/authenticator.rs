/// Authenticator
///
/// Login: resolve user by email, verify password, issue a token, persist it.
/// Request authentication: header, length guard, lookup, expiry, owner.
///
/// Nothing here logs. Errors carry the precise cause back to the caller,
/// which decides what to record and what to show.

use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::auth::headers::{extract_bearer, RequestHeaders, AUTHORIZATION};
use crate::auth::password::verify_password;
use crate::auth::token::{generate_token, TOKEN_LENGTH};
use crate::auth::token_store::TokenStore;
use crate::domain::{Token, User};
use crate::error::{AppError, AuthError};
use crate::users::UserStore;

/// Email/password pair presented at login.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Result of a successful login. `token.plaintext` is set.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: Token,
    pub ttl: Duration,
}

#[derive(Clone)]
pub struct Authenticator {
    users: UserStore,
    tokens: TokenStore,
    login_ttl: Duration,
}

impl Authenticator {
    pub fn new(users: UserStore, tokens: TokenStore, login_ttl: Duration) -> Self {
        Self {
            users,
            tokens,
            login_ttl,
        }
    }

    /// Log a user in and hand back the only copy of their new token.
    ///
    /// # Errors
    /// - `AuthError::UserNotFound` if no user has this email
    /// - `AuthError::InvalidCredentials` if the password does not match
    /// - `AuthError::CorruptPasswordHash` if the stored hash cannot be parsed
    /// - `AppError::Randomness` / `AppError::Database` from issuance and persistence
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<IssuedToken, AppError> {
        let user = self
            .users
            .get_by_email(&credentials.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        match verify_password(&credentials.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials.into()),
            Err(_) => return Err(AuthError::CorruptPasswordHash.into()),
        }

        let new_token = generate_token(user.id, self.login_ttl)?;
        let token = self.tokens.save(new_token, &user).await?;

        Ok(IssuedToken {
            token,
            ttl: self.login_ttl,
        })
    }

    /// Resolve the user behind a request's `Authorization: Bearer` header.
    pub async fn authenticate_request<R>(&self, request: &R) -> Result<User, AppError>
    where
        R: RequestHeaders + ?Sized,
    {
        self.authenticate_header(request.header_value(AUTHORIZATION))
            .await
    }

    /// Same as [`Authenticator::authenticate_request`], given the raw header value.
    pub async fn authenticate_header(&self, header: Option<&str>) -> Result<User, AppError> {
        let plaintext = extract_bearer(header)?;
        let (_, user) = self.resolve(plaintext).await?;
        Ok(user)
    }

    /// Issue and persist a token for `user_id` with a caller-chosen lifetime.
    /// Any token the user already had is superseded.
    pub async fn issue_token(&self, user_id: i64, ttl: Duration) -> Result<Token, AppError> {
        let user = self
            .users
            .get_one(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let new_token = generate_token(user.id, ttl)?;
        self.tokens.save(new_token, &user).await
    }

    /// Whether `plaintext` currently authenticates anyone.
    ///
    /// Credential failures are `Ok(false)`; only store failures are errors.
    pub async fn validate_token(&self, plaintext: &str) -> Result<bool, AppError> {
        match self.resolve(plaintext).await {
            Ok(_) => Ok(true),
            Err(AppError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete the token matching `plaintext`, if any.
    pub async fn revoke_token(&self, plaintext: &str) -> Result<(), AppError> {
        self.tokens.delete_by_plaintext(plaintext).await
    }

    // Shared by both validation paths so they cannot drift apart:
    // length, existence, expiry, then owner.
    async fn resolve(&self, plaintext: &str) -> Result<(Token, User), AppError> {
        if plaintext.len() != TOKEN_LENGTH {
            return Err(AuthError::WrongTokenLength.into());
        }

        let token = self
            .tokens
            .find_by_plaintext(plaintext)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if token.is_expired_at(Utc::now()) {
            return Err(AuthError::ExpiredToken.into());
        }

        let user = self
            .tokens
            .find_user_for_token(&token)
            .await?
            .ok_or(AuthError::OrphanedToken)?;

        Ok((token, user))
    }
}
