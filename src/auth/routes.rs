//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router, nested under `/api/auth`
///
/// # Routes
/// - `POST /register` - Create a password account and log in
/// - `POST /login` - Password login
/// - `POST /refresh-token` - New access token from the refresh cookie
/// - `GET /me` - Current user information
/// - `GET /logout` - Destroy the session and clear cookies
/// - `GET /google` - Start Google sign-in
/// - `GET /google/callback` - Google sign-in redirect target
pub fn auth_routes() -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh-token", post(handlers::refresh_token))
        .route("/me", get(handlers::me))
        .route("/logout", get(handlers::logout))
        .route("/google", get(handlers::google_start))
        .route("/google/callback", get(handlers::google_callback))
}
