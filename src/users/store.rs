//! Credential store: persistence of user records
//!
//! Every method is a single SQL statement. Uniqueness (email, OAuth identity)
//! is enforced by the schema, so callers classify `sqlx::Error` with
//! [`is_unique_violation`](crate::common::helpers::is_unique_violation)
//! instead of checking before writing.

use sqlx::SqlitePool;

use super::models::{NewUser, ProfileChanges, User};
use crate::common::helpers::normalize_email;

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_oauth_id(
        &self,
        provider: &str,
        oauth_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE oauth_provider = ? AND oauth_id = ?")
            .bind(provider)
            .bind(oauth_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Insert a user. A duplicate email surfaces as a unique violation.
    pub async fn insert(&self, user: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash, role, oauth_provider, oauth_id, avatar_url)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(normalize_email(&user.email))
        .bind(user.name.trim())
        .bind(user.password_hash.as_deref())
        .bind(user.role.as_str())
        .bind(user.oauth_provider.as_deref())
        .bind(user.oauth_id.as_deref())
        .bind(user.avatar_url.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    /// Attach an external identity to an account that has none yet.
    ///
    /// Returns `None` if the row is gone or was linked concurrently; an
    /// existing linkage is never overwritten. The avatar is only backfilled.
    pub async fn link_oauth(
        &self,
        id: i64,
        provider: &str,
        oauth_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET oauth_provider = ?,
                oauth_id = ?,
                avatar_url = COALESCE(avatar_url, ?),
                updated_at = datetime('now')
            WHERE id = ? AND oauth_id IS NULL
            RETURNING *
            "#,
        )
        .bind(provider)
        .bind(oauth_id)
        .bind(avatar_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_profile(
        &self,
        id: i64,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                email = COALESCE(?, email),
                role = COALESCE(?, role),
                avatar_url = COALESCE(?, avatar_url),
                updated_at = datetime('now')
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.email.as_deref().map(normalize_email))
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.avatar_url.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ? RETURNING *",
        )
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = ?, updated_at = datetime('now') WHERE id = ? RETURNING *",
        )
        .bind(is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
