use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::CredentialStore;
use crate::domain::{NewToken, Token, User, UserUpdate};
use crate::error::{AppError, DatabaseError};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tokens: BTreeMap<i64, Token>,
    next_user_id: i64,
    next_token_id: i64,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Process-local `CredentialStore` with the same constraints as the SQL
/// schema: unique emails, unique digests, tokens must reference a user.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens, across all users.
    pub async fn token_count(&self) -> usize {
        self.tables.read().await.tokens.len()
    }

    /// Stored tokens owned by `user_id`.
    pub async fn tokens_for_user(&self, user_id: i64) -> Vec<Token> {
        self.tables
            .read()
            .await
            .tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn duplicate_email() -> AppError {
    AppError::Database(DatabaseError::UniqueConstraintViolation(
        "duplicate key value violates unique constraint".to_string(),
    ))
}

fn missing_user() -> AppError {
    AppError::Database(DatabaseError::NotFound("user".to_string()))
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.last_name.cmp(&b.last_name));
        Ok(users)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<i64, AppError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(email, None) {
            return Err(duplicate_email());
        }

        tables.next_user_id += 1;
        let id = tables.next_user_id;
        let now = Utc::now();
        tables.users.insert(
            id,
            User {
                id,
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                password_hash: password_hash.to_string(),
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    async fn update_user(&self, id: i64, changes: &UserUpdate) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&changes.email, Some(id)) {
            return Err(duplicate_email());
        }

        let user = tables.users.get_mut(&id).ok_or_else(missing_user)?;
        user.email = changes.email.clone();
        user.first_name = changes.first_name.clone();
        user.last_name = changes.last_name.clone();
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or_else(missing_user)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        tables.users.remove(&id).ok_or_else(missing_user)?;
        tables.tokens.retain(|_, t| t.user_id != id);

        Ok(())
    }

    async fn find_token_by_hash(&self, token_hash: &[u8]) -> Result<Option<Token>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn replace_user_token(&self, token: &NewToken, email: &str) -> Result<Token, AppError> {
        // One write lock covers delete and insert, so supersession is atomic here.
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&token.user_id) {
            return Err(AppError::Database(DatabaseError::ForeignKeyViolation(
                "tokens.user_id references a missing user".to_string(),
            )));
        }

        tables.tokens.retain(|_, t| t.user_id != token.user_id);
        if tables.tokens.values().any(|t| t.token_hash == token.token_hash) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "duplicate token hash".to_string(),
            )));
        }

        tables.next_token_id += 1;
        let now = Utc::now();
        let stored = Token {
            id: tables.next_token_id,
            user_id: token.user_id,
            email: email.to_string(),
            plaintext: None,
            token_hash: token.token_hash.clone(),
            created_at: now,
            updated_at: now,
            expiry: token.expiry,
        };
        tables.tokens.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn delete_token_by_hash(&self, token_hash: &[u8]) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .tokens
            .retain(|_, t| t.token_hash != token_hash);

        Ok(())
    }
}
