// Error handling types for the API

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::fmt;
use tracing::error;

use super::cookies::clear_auth_cookies;
use super::response::ApiResponse;
use super::validation::ValidationResult;
use crate::auth::tokens::TokenClass;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    ValidationFailed(String),
    EmailInUse,
    InvalidCredentials,
    OAuthOnlyAccount,
    MissingToken(TokenClass),
    TokenExpired,
    TokenMalformed(TokenClass),
    TokenInvalid,
    UserNotFound,
    AccountDeactivated,
    MissingEmail,
    ProviderConflict,
    UserCreationFailed,
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    ServiceUnavailable(String),
    DatabaseError(sqlx::Error),
    InternalServer(String),
}

impl ApiError {
    /// Failures that invalidate the caller's token must also drop its cookies
    /// so the client cannot retry with a known-bad credential.
    pub fn clears_auth_cookies(&self) -> bool {
        matches!(
            self,
            ApiError::TokenExpired
                | ApiError::TokenMalformed(_)
                | ApiError::TokenInvalid
                | ApiError::UserNotFound
                | ApiError::AccountDeactivated
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::EmailInUse => StatusCode::CONFLICT,
            ApiError::InvalidCredentials
            | ApiError::OAuthOnlyAccount
            | ApiError::MissingToken(_)
            | ApiError::TokenExpired
            | ApiError::TokenInvalid
            | ApiError::UserNotFound
            | ApiError::AccountDeactivated
            | ApiError::MissingEmail
            | ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::TokenMalformed(TokenClass::Refresh) => StatusCode::UNAUTHORIZED,
            ApiError::TokenMalformed(TokenClass::Access) => StatusCode::FORBIDDEN,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ProviderConflict
            | ApiError::UserCreationFailed
            | ApiError::DatabaseError(_)
            | ApiError::InternalServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationFailed(_) => "VALIDATION_FAILED",
            ApiError::EmailInUse => "EMAIL_IN_USE",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::OAuthOnlyAccount => "OAUTH_ONLY_ACCOUNT",
            ApiError::MissingToken(_) => "MISSING_TOKEN",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::TokenMalformed(_) => "TOKEN_MALFORMED",
            ApiError::TokenInvalid => "TOKEN_INVALID",
            ApiError::UserNotFound => "USER_NOT_FOUND",
            ApiError::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            ApiError::MissingEmail => "MISSING_EMAIL",
            ApiError::ProviderConflict => "PROVIDER_CONFLICT",
            ApiError::UserCreationFailed => "USER_CREATION_FAILED",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalServer(_) => "SERVER_ERROR",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::ValidationFailed(_) => "Validation failed",
            ApiError::EmailInUse => "Email already in use",
            // Same wording for unknown email and wrong password.
            ApiError::InvalidCredentials => "Invalid credentials",
            ApiError::OAuthOnlyAccount => "Please login with Google",
            ApiError::MissingToken(TokenClass::Access) => "Access token required",
            ApiError::MissingToken(TokenClass::Refresh) => "Refresh token required",
            ApiError::TokenExpired => "Token expired",
            ApiError::TokenMalformed(_) | ApiError::TokenInvalid => "Invalid token",
            ApiError::UserNotFound => "User not found",
            ApiError::AccountDeactivated => "Account deactivated",
            ApiError::MissingEmail => "Authentication failed",
            ApiError::ProviderConflict | ApiError::UserCreationFailed => {
                "OAuth authentication failed"
            }
            ApiError::Unauthenticated(_) => "Not authenticated",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "Not found",
            ApiError::ServiceUnavailable(_) => "Service unavailable",
            ApiError::DatabaseError(_) | ApiError::InternalServer(_) => "Server error",
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            ApiError::ValidationFailed(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg) => Some(msg.clone()),
            ApiError::MissingToken(_) => Some("No token provided".to_string()),
            ApiError::TokenExpired => Some("Please login again".to_string()),
            ApiError::TokenMalformed(_) => Some("Token is malformed".to_string()),
            ApiError::TokenInvalid => Some("Token verification failed".to_string()),
            ApiError::AccountDeactivated => Some("User account is not active".to_string()),
            ApiError::MissingEmail => Some("No email provided by identity provider".to_string()),
            ApiError::ProviderConflict => {
                Some("Email already associated with a different provider".to_string())
            }
            // Diagnostics for unexpected failures stay out of release builds.
            ApiError::DatabaseError(e) if cfg!(debug_assertions) => Some(e.to_string()),
            ApiError::InternalServer(msg) if cfg!(debug_assertions) => Some(msg.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            other => match other.detail() {
                Some(detail) => write!(f, "{}: {}", other.message(), detail),
                None => write!(f, "{}", other.message()),
            },
        }
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let ApiError::DatabaseError(e) = &self {
            error!(error = %e, "Database error occurred");
        }

        let mut headers = HeaderMap::new();
        if self.clears_auth_cookies() {
            clear_auth_cookies(&mut headers);
        }

        let body = ApiResponse::failure(self.message(), self.code(), self.detail());
        (self.status(), headers, Json(body)).into_response()
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        let error_messages: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        ApiError::ValidationFailed(error_messages.join(", "))
    }
}
