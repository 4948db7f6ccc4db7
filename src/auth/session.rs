//! Server-side sessions keyed by an opaque cookie value
//!
//! Only a SHA-256 of the cookie value is stored, so a leaked `sessions` table
//! cannot be replayed as cookies. Every write completes before the caller
//! builds its response.

use base64::Engine;
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};
use std::time::Duration;
use tracing::{debug, error};

use crate::common::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to generate session id: {0}")]
    Rng(#[from] rand::Error),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Database(db) => ApiError::DatabaseError(db),
            SessionError::Rng(rng) => {
                error!(error = %rng, "Session id generation failed");
                ApiError::InternalServer("session creation failed".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    pub user_id: Option<i64>,
    pub authenticated: bool,
    pub oauth_state: Option<String>,
    pub expires_at: i64,
}

/// New values for a session's mutable fields
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub user_id: Option<i64>,
    pub authenticated: bool,
    pub oauth_state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create an empty session; returns the raw cookie value and the record.
    pub async fn create(&self) -> Result<(String, Session), SessionError> {
        let now = Utc::now().timestamp();

        // Opportunistic cleanup; there is no background sweeper.
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            debug!(purged = purged, "Purged expired sessions");
        }

        let token = generate_session_token()?;
        let expires_at = now + self.ttl.as_secs() as i64;
        sqlx::query(
            "INSERT INTO sessions (id_hash, authenticated, created_at, expires_at) VALUES (?, 0, ?, ?)",
        )
        .bind(hash_session_token(&token))
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok((
            token,
            Session {
                user_id: None,
                authenticated: false,
                oauth_state: None,
                expires_at,
            },
        ))
    }

    /// Live session for `token`; expired sessions read as absent.
    pub async fn get(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT user_id, authenticated, oauth_state, expires_at FROM sessions WHERE id_hash = ? AND expires_at > ?",
        )
        .bind(hash_session_token(token))
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Overwrite the mutable fields; `false` when the session is gone.
    pub async fn set(&self, token: &str, update: &SessionUpdate) -> Result<bool, SessionError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET user_id = ?, authenticated = ?, oauth_state = ?
            WHERE id_hash = ? AND expires_at > ?
            "#,
        )
        .bind(update.user_id)
        .bind(update.authenticated)
        .bind(update.oauth_state.as_deref())
        .bind(hash_session_token(token))
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a session; `false` when there was none.
    pub async fn destroy(&self, token: &str) -> Result<bool, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id_hash = ?")
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace any previous session with a fresh authenticated one for
    /// `user_id`. The id changes on every login.
    pub async fn start_authenticated(
        &self,
        previous: Option<&str>,
        user_id: i64,
    ) -> Result<String, SessionError> {
        if let Some(previous) = previous {
            self.destroy(previous).await?;
        }

        let (token, _) = self.create().await?;
        self.set(
            &token,
            &SessionUpdate {
                user_id: Some(user_id),
                authenticated: true,
                oauth_state: None,
            },
        )
        .await?;
        Ok(token)
    }
}

/// 32 random bytes, URL-safe base64
pub fn generate_session_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; 32];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
