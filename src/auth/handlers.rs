//! Authentication handlers

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::Redirect,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::extractors::AuthedUser;
use super::models::{AuthPayload, LoginRequest, OAuthCallbackParams, RefreshPayload, RegisterRequest};
use super::oauth::{resolve_identity, IdentityProvider};
use super::session::{generate_session_token, SessionUpdate};
use super::tokens::{TokenClass, TokenSubject};
use super::validators::{LoginValidator, RegisterValidator};
use crate::common::cookies::{
    append_cookie, build_cookie, expired_cookie, read_cookie, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE, SESSION_COOKIE,
};
use crate::common::helpers::{is_unique_violation, safe_token_log};
use crate::common::{safe_email_log, ApiError, ApiJson, ApiResponse, AppState, Validator};
use crate::users::models::{NewUser, PublicUser, Role, User};

/// POST /api/auth/register
/// Creates a password account with the `student` role and logs it in
///
/// # Request Body
/// ```json
/// { "name": "Ann", "email": "a@x.com", "password": "Str0ng!Pass" }
/// ```
///
/// # Response (201)
/// ```json
/// { "success": true, "message": "Registration successful", "data": { "user": { ... } }, "error": null }
/// ```
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, ApiResponse<AuthPayload>), ApiError> {
    RegisterValidator.validate(&payload).into_result()?;

    if state.users.find_by_email(&payload.email).await?.is_some() {
        info!(email = %safe_email_log(&payload.email), "Registration rejected: email in use");
        return Err(ApiError::EmailInUse);
    }

    let password_hash = state.hasher.hash(&payload.password).await?;
    let new_user = NewUser {
        email: payload.email,
        name: payload.name,
        password_hash: Some(password_hash),
        role: Role::Student,
        ..Default::default()
    };

    // The precheck above is only a fast path; the UNIQUE index decides races.
    let user = state.users.insert(&new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            info!(email = %safe_email_log(&new_user.email), "Registration lost race on email");
            ApiError::EmailInUse
        } else {
            ApiError::DatabaseError(e)
        }
    })?;

    let cookies = establish_login(&state, &headers, &user).await?;

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        "User registered"
    );

    Ok((
        StatusCode::CREATED,
        cookies,
        ApiResponse::ok(
            "Registration successful",
            AuthPayload {
                user: PublicUser::from(user),
            },
        ),
    ))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password produce the same `InvalidCredentials`.
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, ApiResponse<AuthPayload>), ApiError> {
    LoginValidator.validate(&payload).into_result()?;

    let user = match state.users.find_by_email(&payload.email).await? {
        Some(user) => user,
        None => {
            debug!(email = %safe_email_log(&payload.email), "Login failed: unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let digest = match user.password_hash.as_deref() {
        Some(digest) => digest,
        None => {
            info!(user_id = user.id, "Password login attempted on OAuth-only account");
            return Err(ApiError::OAuthOnlyAccount);
        }
    };

    if !state.hasher.verify(&payload.password, digest).await {
        debug!(user_id = user.id, "Login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = user.id, "Login rejected: account deactivated");
        return Err(ApiError::AccountDeactivated);
    }

    let cookies = establish_login(&state, &headers, &user).await?;

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        "User logged in"
    );

    Ok((
        cookies,
        ApiResponse::ok(
            "Login successful",
            AuthPayload {
                user: PublicUser::from(user),
            },
        ),
    ))
}

/// GET /api/auth/logout
///
/// Best effort: destroys the session if there is one and always expires the
/// token and session cookies.
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> (HeaderMap, ApiResponse<()>) {
    if let Some(token) = read_cookie(&headers, SESSION_COOKIE) {
        match state.sessions.destroy(&token).await {
            Ok(true) => debug!("Session destroyed"),
            Ok(false) => debug!("Logout without a live session"),
            Err(e) => warn!(error = %e, "Failed to destroy session during logout"),
        }
    }

    let secure = state.config.production;
    let mut cookies = HeaderMap::new();
    append_cookie(&mut cookies, expired_cookie(ACCESS_TOKEN_COOKIE, secure));
    append_cookie(&mut cookies, expired_cookie(REFRESH_TOKEN_COOKIE, secure));
    append_cookie(&mut cookies, expired_cookie(SESSION_COOKIE, secure));

    info!("User logged out");
    (cookies, ApiResponse::message("Logged out successfully"))
}

/// POST /api/auth/refresh-token
/// Issues a new access token from the `refreshToken` cookie
///
/// # Response
/// ```json
/// { "success": true, "message": "Token refreshed", "data": { "accessToken": "...", "user": { ... } }, "error": null }
/// ```
pub async fn refresh_token(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(HeaderMap, ApiResponse<RefreshPayload>), ApiError> {
    let token = read_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .ok_or(ApiError::MissingToken(TokenClass::Refresh))?;

    let claims = state
        .tokens
        .verify(&token, TokenClass::Refresh)
        .map_err(|e| {
            warn!(error = %e, token = %safe_token_log(&token), "Refresh token rejected");
            e.into_api_error(TokenClass::Refresh)
        })?;

    let user = state
        .users
        .find_by_id(claims.id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = claims.id, "Refresh for a user that no longer exists");
            ApiError::UserNotFound
        })?;

    if !user.is_active {
        warn!(user_id = user.id, "Refresh rejected: account deactivated");
        return Err(ApiError::AccountDeactivated);
    }

    let access_token = state
        .tokens
        .issue_access_token(&TokenSubject::from(&user))
        .map_err(|e| e.into_api_error(TokenClass::Access))?;

    let mut cookies = HeaderMap::new();
    append_cookie(
        &mut cookies,
        build_cookie(
            ACCESS_TOKEN_COOKIE,
            &access_token,
            state.tokens.ttl(TokenClass::Access),
            state.config.production,
        ),
    );

    debug!(user_id = user.id, "Access token refreshed");

    Ok((
        cookies,
        ApiResponse::ok(
            "Token refreshed",
            RefreshPayload {
                access_token,
                user: PublicUser::from(user),
            },
        ),
    ))
}

/// GET /api/auth/me
/// Returns the current authenticated user's information
pub async fn me(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<ApiResponse<AuthPayload>, ApiError> {
    let user = state
        .users
        .find_by_id(authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok(
        "Current user",
        AuthPayload {
            user: PublicUser::from(user),
        },
    ))
}

/// GET /api/auth/google
/// Starts the provider redirect, binding a fresh `state` value to a new session
pub async fn google_start(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Redirect), ApiError> {
    let provider = identity_provider(&state)?;

    let oauth_state = generate_session_token().map_err(|e| {
        error!(error = %e, "Failed to generate OAuth state");
        ApiError::InternalServer("failed to start OAuth flow".to_string())
    })?;

    if let Some(previous) = read_cookie(&headers, SESSION_COOKIE) {
        state.sessions.destroy(&previous).await?;
    }
    let (session_token, _) = state.sessions.create().await?;
    state
        .sessions
        .set(
            &session_token,
            &SessionUpdate {
                user_id: None,
                authenticated: false,
                oauth_state: Some(oauth_state.clone()),
            },
        )
        .await?;

    let mut cookies = HeaderMap::new();
    append_cookie(
        &mut cookies,
        build_cookie(
            SESSION_COOKIE,
            &session_token,
            state.sessions.ttl(),
            state.config.production,
        ),
    );

    info!(provider = provider.name(), "Starting OAuth flow");
    Ok((cookies, Redirect::to(&provider.authorization_url(&oauth_state))))
}

/// GET /api/auth/google/callback
///
/// On any failure no auth cookies are set.
pub async fn google_callback(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<(HeaderMap, ApiResponse<AuthPayload>), ApiError> {
    let provider = identity_provider(&state)?;

    if let Some(error) = params.error.as_deref() {
        warn!(oauth_error = %error, provider = provider.name(), "Provider returned error");
        return Err(ApiError::Unauthenticated("Authentication failed".to_string()));
    }

    let session_token = read_cookie(&headers, SESSION_COOKIE)
        .ok_or_else(|| ApiError::Unauthenticated("No OAuth session".to_string()))?;
    let session = state
        .sessions
        .get(&session_token)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("OAuth session expired".to_string()))?;

    match (session.oauth_state.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(actual)) if expected == actual => {}
        _ => {
            warn!(provider = provider.name(), "OAuth state mismatch");
            return Err(ApiError::Unauthenticated("Invalid OAuth state".to_string()));
        }
    }

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::ValidationFailed("code: Authorization code is required".to_string()))?;

    let profile = provider.exchange_code(code).await.map_err(|e| {
        error!(error = %e, provider = provider.name(), "Authorization code exchange failed");
        ApiError::InternalServer("OAuth authentication failed".to_string())
    })?;

    let user = resolve_identity(&state.users, provider.name(), &profile).await?;

    if !user.is_active {
        warn!(user_id = user.id, "OAuth login rejected: account deactivated");
        return Err(ApiError::AccountDeactivated);
    }

    let cookies = establish_login(&state, &headers, &user).await?;

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        provider = provider.name(),
        "User logged in via OAuth"
    );

    Ok((
        cookies,
        ApiResponse::ok(
            "Successfully logged in",
            AuthPayload {
                user: PublicUser::from(user),
            },
        ),
    ))
}

// ---- Helper Functions ----

fn identity_provider(state: &AppState) -> Result<&Arc<dyn IdentityProvider>, ApiError> {
    state.identity.as_ref().ok_or_else(|| {
        warn!("OAuth requested but no identity provider is configured");
        ApiError::ServiceUnavailable("Google sign-in is not configured".to_string())
    })
}

/// Rotate the session to an authenticated one for `user` and issue both
/// tokens. The session write completes before the cookies are returned.
async fn establish_login(
    state: &AppState,
    request_headers: &HeaderMap,
    user: &User,
) -> Result<HeaderMap, ApiError> {
    let previous = read_cookie(request_headers, SESSION_COOKIE);
    let session_token = state
        .sessions
        .start_authenticated(previous.as_deref(), user.id)
        .await?;

    let subject = TokenSubject::from(user);
    let access_token = state
        .tokens
        .issue_access_token(&subject)
        .map_err(|e| e.into_api_error(TokenClass::Access))?;
    let refresh_token = state
        .tokens
        .issue_refresh_token(&subject)
        .map_err(|e| e.into_api_error(TokenClass::Refresh))?;

    let secure = state.config.production;
    let mut cookies = HeaderMap::new();
    append_cookie(
        &mut cookies,
        build_cookie(
            ACCESS_TOKEN_COOKIE,
            &access_token,
            state.tokens.ttl(TokenClass::Access),
            secure,
        ),
    );
    append_cookie(
        &mut cookies,
        build_cookie(
            REFRESH_TOKEN_COOKIE,
            &refresh_token,
            state.tokens.ttl(TokenClass::Refresh),
            secure,
        ),
    );
    append_cookie(
        &mut cookies,
        build_cookie(SESSION_COOKIE, &session_token, state.sessions.ttl(), secure),
    );
    Ok(cookies)
}
