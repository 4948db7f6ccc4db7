// src/main.rs
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod app;
mod auth;
mod common;
mod logging_middleware;
mod services;
mod users;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::oauth::IdentityProvider;
use common::config::AppConfig;
use common::AppState;
use services::GoogleProvider;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;
    info!(
        production = config.production,
        access_ttl_secs = config.access_token_ttl.as_secs(),
        refresh_ttl_secs = config.refresh_token_ttl.as_secs(),
        session_ttl_secs = config.session_ttl.as_secs(),
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .acquire_timeout(config.database_acquire_timeout)
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let identity: Option<Arc<dyn IdentityProvider>> = match config.google.clone() {
        Some(google) => {
            info!("GoogleProvider initialized");
            Some(Arc::new(GoogleProvider::new(google)))
        }
        None => None,
    };

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let port = config.port;
    let cors_origins: Vec<axum::http::HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let shared = Arc::new(AppState::new(pool, config, identity)?);

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = app::build_router(shared)
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
