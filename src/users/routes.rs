// src/users/routes.rs

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use super::handlers;

/// User management router, nested under `/api/user`. Every route requires an
/// access token.
pub fn users_routes() -> Router {
    Router::new()
        .route("/create", post(handlers::create_user))
        .route("/get", get(handlers::list_users))
        .route("/get/:id", get(handlers::get_user))
        .route("/search/by-email", get(handlers::search_by_email))
        .route("/edit/:id", put(handlers::update_user))
        .route("/edit/:id/password", put(handlers::change_password))
        .route("/toggle-status/:id", patch(handlers::toggle_status))
        .route("/delete/:id", delete(handlers::delete_user))
}
