// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing; `RESET_DB=true` drops them first.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - Dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
    }

    create_schema(pool).await?;

    info!("Database migration completed successfully");
    Ok(())
}

/// Create the users and sessions tables and their indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Email uniqueness is enforced here, not by the handlers.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name TEXT NOT NULL,
            password_hash TEXT,
            role TEXT NOT NULL DEFAULT 'student'
                CHECK (role IN ('student', 'instructor', 'admin')),
            oauth_provider TEXT,
            oauth_id TEXT,
            avatar_url TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_oauth
        ON users(oauth_provider, oauth_id)
        WHERE oauth_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id_hash BLOB PRIMARY KEY,
            user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
            authenticated INTEGER NOT NULL DEFAULT 0,
            oauth_state TEXT,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DROP TABLE IF EXISTS sessions")
        .execute(pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS users").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
pub async fn setup_test_db() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}
