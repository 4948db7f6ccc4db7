// src/app.rs
use axum::{extract::Extension, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::auth_routes;
use crate::common::AppState;
use crate::logging_middleware;
use crate::users::users_routes;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Application routes with state attached; transport layers (CORS, tracing)
/// are added by `main`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // ====================================================================
        // AUTHENTICATION ROUTES
        // ====================================================================
        .nest("/api/auth", auth_routes())
        // ====================================================================
        // USER MANAGEMENT ROUTES
        // ====================================================================
        .nest("/api/user", users_routes())
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(state))
}
