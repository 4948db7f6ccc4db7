// src/common/config.rs
//! Runtime configuration loaded from environment variables

use std::env;
use std::time::Duration;
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev_access_secret_change_me";
const DEV_JWT_REFRESH_SECRET: &str = "dev_refresh_secret_change_me";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingSecret(&'static str),

    #[error("{key} is not a valid number: {value}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Argon2 work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_acquire_timeout: Duration,
    pub port: u16,
    pub production: bool,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub session_ttl: Duration,
    pub hash_params: HashParams,
    pub google: Option<GoogleConfig>,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let jwt_secret = secret_from_env("JWT_SECRET", DEV_JWT_SECRET, production)?;
        let jwt_refresh_secret =
            secret_from_env("JWT_REFRESH_SECRET", DEV_JWT_REFRESH_SECRET, production)?;

        let google = match (
            env::var("GOOGLE_CLIENT_ID").ok(),
            env::var("GOOGLE_CLIENT_SECRET").ok(),
        ) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                callback_url: env::var("GOOGLE_CALLBACK_URL").unwrap_or_else(|_| {
                    "http://localhost:8080/api/auth/google/callback".to_string()
                }),
            }),
            _ => {
                warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set, Google sign-in disabled");
                None
            }
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://lms.db".to_string()),
            database_acquire_timeout: Duration::from_secs(number_from_env(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                5,
            )?),
            port: number_from_env("PORT", 8080)?,
            production,
            jwt_secret,
            jwt_refresh_secret,
            access_token_ttl: Duration::from_secs(number_from_env("JWT_ACCESS_TTL_SECS", 3600)?),
            refresh_token_ttl: Duration::from_secs(number_from_env(
                "JWT_REFRESH_TTL_SECS",
                7 * 24 * 60 * 60,
            )?),
            session_ttl: Duration::from_secs(number_from_env("SESSION_TTL_SECS", 24 * 60 * 60)?),
            hash_params: HashParams {
                memory_kib: number_from_env("PASSWORD_HASH_MEMORY_KIB", 19_456)?,
                iterations: number_from_env("PASSWORD_HASH_ITERATIONS", 2)?,
                parallelism: number_from_env("PASSWORD_HASH_PARALLELISM", 1)?,
            },
            google,
            cors_origins,
        })
    }

    /// Configuration used by unit and router tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            database_acquire_timeout: Duration::from_secs(5),
            port: 0,
            production: false,
            jwt_secret: "test_access_secret".to_string(),
            jwt_refresh_secret: "test_refresh_secret".to_string(),
            access_token_ttl: Duration::from_secs(3600),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            hash_params: HashParams {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            google: None,
            cors_origins: Vec::new(),
        }
    }
}

fn secret_from_env(
    key: &'static str,
    dev_default: &str,
    production: bool,
) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ if production => Err(ConfigError::MissingSecret(key)),
        _ => {
            warn!(key = key, "Secret not set, using development default");
            Ok(dev_default.to_string())
        }
    }
}

fn number_from_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        Err(_) => Ok(default),
    }
}
