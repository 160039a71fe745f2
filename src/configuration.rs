use std::time::Duration;

use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
    pub query_timeout_milliseconds: u64,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    /// Upper bound for every store round-trip.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_milliseconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_seconds)
    }
}

/// Token issuance settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct AuthSettings {
    pub login_token_ttl_seconds: i64, // 86400 = 24 hours
}

impl AuthSettings {
    pub fn login_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.login_token_ttl_seconds)
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            login_token_ttl_seconds: 24 * 60 * 60,
        }
    }
}

impl Settings {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.auth.login_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.login_token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::InvalidValue(
                "database.min_connections exceeds database.max_connections".to_string(),
            ));
        }
        if self.database.query_timeout_milliseconds == 0 {
            return Err(ConfigError::InvalidValue(
                "database.query_timeout_milliseconds must be positive".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Load `configuration.yaml` (if present) and overlay `APP__SECTION__KEY`
/// environment variables, e.g. `APP__DATABASE__PASSWORD`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")
        .and_then(|b| b.set_default("application.port", 8081))
        .and_then(|b| b.set_default("database.max_connections", 5))
        .and_then(|b| b.set_default("database.min_connections", 1))
        .and_then(|b| b.set_default("database.idle_timeout_seconds", 300))
        .and_then(|b| b.set_default("database.max_lifetime_seconds", 300))
        .and_then(|b| b.set_default("database.query_timeout_milliseconds", 3000))
        .and_then(|b| b.set_default("auth.login_token_ttl_seconds", 24 * 60 * 60))
        .map_err(ConfigError::Load)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(ConfigError::Load)?;

    settings
        .try_deserialize::<Settings>()
        .map_err(ConfigError::Load)?
        .validate()
}
