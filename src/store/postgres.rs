use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::CredentialStore;
use crate::configuration::DatabaseSettings;
use crate::domain::{NewToken, Token, User, UserUpdate};
use crate::error::{AppError, DatabaseError};

/// Build the connection pool and make sure the database answers.
pub async fn connect_pool(settings: &DatabaseSettings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .idle_timeout(settings.idle_timeout())
        .max_lifetime(settings.max_lifetime())
        .acquire_timeout(settings.query_timeout())
        .connect(&settings.connection_string())
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    password: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: i64,
    user_id: i64,
    email: String,
    token_hash: Vec<u8>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expiry: DateTime<Utc>,
}

impl From<TokenRow> for Token {
    fn from(row: TokenRow) -> Self {
        Token {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            plaintext: None,
            token_hash: row.token_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expiry: row.expiry,
        }
    }
}

/// `CredentialStore` over a shared Postgres pool.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn not_found_if_untouched(rows_affected: u64, what: &str) -> Result<(), AppError> {
    if rows_affected == 0 {
        return Err(AppError::Database(DatabaseError::NotFound(what.to_string())));
    }
    Ok(())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, first_name, last_name, password, created_at, updated_at
            FROM users
            ORDER BY last_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, first_name, last_name, password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, first_name, last_name, password, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn insert_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<i64, AppError> {
        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (email, first_name, last_name, password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_user(&self, id: i64, changes: &UserUpdate) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $1, first_name = $2, last_name = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(&changes.email)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        not_found_if_untouched(result.rows_affected(), "user")
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        not_found_if_untouched(result.rows_affected(), "user")
    }

    async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut transaction)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut transaction)
            .await?;

        not_found_if_untouched(result.rows_affected(), "user")?;
        transaction.commit().await?;

        Ok(())
    }

    async fn find_token_by_hash(&self, token_hash: &[u8]) -> Result<Option<Token>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, user_id, email, token_hash, created_at, updated_at, expiry
            FROM tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Token::from))
    }

    async fn replace_user_token(&self, token: &NewToken, email: &str) -> Result<Token, AppError> {
        let now = Utc::now();
        let mut transaction = self.pool.begin().await?;

        sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(token.user_id)
            .execute(&mut transaction)
            .await?;

        // Two issuances for the same user can still race past the DELETE under
        // READ COMMITTED. The unique user_id index turns the loser's INSERT into
        // an overwrite, so the last writer wins and one row remains.
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            INSERT INTO tokens (user_id, email, token_hash, created_at, updated_at, expiry)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET email = EXCLUDED.email,
                token_hash = EXCLUDED.token_hash,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at,
                expiry = EXCLUDED.expiry
            RETURNING id, user_id, email, token_hash, created_at, updated_at, expiry
            "#,
        )
        .bind(token.user_id)
        .bind(email)
        .bind(&token.token_hash)
        .bind(now)
        .bind(now)
        .bind(token.expiry)
        .fetch_one(&mut transaction)
        .await?;

        transaction.commit().await?;

        Ok(row.into())
    }

    async fn delete_token_by_hash(&self, token_hash: &[u8]) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
