//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::tokens::TokenClass;
use crate::common::cookies::{read_cookie, ACCESS_TOKEN_COOKIE};
use crate::common::{safe_email_log, ApiError, AppState};
use crate::users::models::{Role, User};

/// Authenticated user extractor
///
/// The one place a caller's identity is derived. The access token is read
/// from the `accessToken` cookie, falling back to `Authorization: Bearer`,
/// and the user is re-loaded so deactivation and deletion apply immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthedUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl AuthedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for AuthedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
        }
    }
}

fn access_token_from_headers(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, ACCESS_TOKEN_COOKIE).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let token = access_token_from_headers(&parts.headers).ok_or_else(|| {
            debug!("Authentication failed: no access token");
            ApiError::MissingToken(TokenClass::Access)
        })?;

        let claims = app_state
            .tokens
            .verify(&token, TokenClass::Access)
            .map_err(|e| {
                warn!(error = %e, "Access token rejected");
                e.into_api_error(TokenClass::Access)
            })?;

        let user = app_state
            .users
            .find_by_id(claims.id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = claims.id, "Authentication failed: user not found in database");
                ApiError::UserNotFound
            })?;

        if !user.is_active {
            warn!(user_id = user.id, "Authentication failed: account deactivated");
            return Err(ApiError::AccountDeactivated);
        }

        debug!(
            user_id = user.id,
            email = %safe_email_log(&user.email),
            role = %user.role,
            "User authenticated via extractor"
        );
        Ok(AuthedUser::from(&user))
    }
}
