// src/users/handlers.rs

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::models::{
    ChangePasswordRequest, CreateUserRequest, EmailQuery, NewUser, ProfileChanges, PublicUser,
    Role, UpdateStatusRequest, UpdateUserRequest, User,
};
use super::validators::{
    ChangePasswordValidator, CreateUserValidator, UpdateStatusValidator, UpdateUserValidator,
};
use crate::auth::{AuthedUser, ADMIN_ONLY, SELF_OR_ADMIN};
use crate::common::helpers::{is_unique_violation, normalize_email};
use crate::common::{safe_email_log, ApiError, ApiJson, ApiPath, ApiResponse, AppState, Validator};

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

async fn load_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    state.users.find_by_id(id).await?.ok_or_else(user_not_found)
}

fn email_conflict(e: sqlx::Error) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::EmailInUse
    } else {
        ApiError::DatabaseError(e)
    }
}

/// POST /api/user/create - Create a user (admin)
pub async fn create_user(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, ApiResponse<PublicUser>), ApiError> {
    ADMIN_ONLY.check(&authed, None)?;
    CreateUserValidator.validate(&request).into_result()?;

    if state.users.find_by_email(&request.email).await?.is_some() {
        return Err(ApiError::EmailInUse);
    }

    let password_hash = match (&request.oauth_provider, &request.password) {
        (None, Some(password)) => Some(state.hasher.hash(password).await?),
        _ => None,
    };

    let user = state
        .users
        .insert(&NewUser {
            email: request.email,
            name: request.name,
            password_hash,
            role: request.role,
            oauth_provider: request.oauth_provider,
            oauth_id: request.oauth_id,
            avatar_url: request.avatar_url.filter(|u| !u.trim().is_empty()),
        })
        .await
        .map_err(email_conflict)?;

    info!(
        admin_user_id = authed.id,
        user_id = user.id,
        email = %safe_email_log(&user.email),
        role = %user.role,
        "User created by admin"
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User created successfully", PublicUser::from(user)),
    ))
}

/// GET /api/user/get - List users (admin)
pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<ApiResponse<Vec<PublicUser>>, ApiError> {
    ADMIN_ONLY.check(&authed, None)?;

    let users: Vec<PublicUser> = state
        .users
        .list()
        .await?
        .iter()
        .map(PublicUser::from)
        .collect();

    info!(
        admin_user_id = authed.id,
        user_count = users.len(),
        "Users list fetched"
    );
    Ok(ApiResponse::ok("Users retrieved successfully", users))
}

/// GET /api/user/get/:id - Fetch one user (self or admin)
pub async fn get_user(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    SELF_OR_ADMIN.check(&authed, Some(id))?;
    let user = load_user(&state, id).await?;
    Ok(ApiResponse::ok("User found", PublicUser::from(user)))
}

/// GET /api/user/search/by-email?email= - Look up a user by email (admin)
pub async fn search_by_email(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    Query(query): Query<EmailQuery>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    ADMIN_ONLY.check(&authed, None)?;

    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::ValidationFailed("email: Email parameter is required".to_string()))?;

    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(ApiResponse::ok("User found", PublicUser::from(user)))
}

/// PUT /api/user/edit/:id - Update profile fields (self or admin)
///
/// Only an admin may change a role.
pub async fn update_user(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    SELF_OR_ADMIN.check(&authed, Some(id))?;
    UpdateUserValidator.validate(&request).into_result()?;

    if request.role.is_some() && !authed.is_admin() {
        warn!(user_id = authed.id, target = id, "Role change denied for non-admin");
        return Err(ApiError::Forbidden("Only admins can change roles".to_string()));
    }

    let current = load_user(&state, id).await?;

    if let Some(email) = request.email.as_deref() {
        if normalize_email(email) != current.email {
            if let Some(other) = state.users.find_by_email(email).await? {
                if other.id != current.id {
                    return Err(ApiError::EmailInUse);
                }
            }
        }
    }

    let changes = ProfileChanges {
        name: request.name,
        email: request.email,
        role: request.role,
        avatar_url: request.avatar_url,
    };
    let user = state
        .users
        .update_profile(id, &changes)
        .await
        .map_err(email_conflict)?
        .ok_or_else(user_not_found)?;

    info!(
        user_id = authed.id,
        target = id,
        role = %user.role,
        "User updated"
    );
    Ok(ApiResponse::ok("User updated successfully", PublicUser::from(user)))
}

/// PUT /api/user/edit/:id/password - Change own password
pub async fn change_password(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    if authed.id != id {
        warn!(user_id = authed.id, target = id, "Password change for another user denied");
        return Err(ApiError::Forbidden(
            "You can only change your own password".to_string(),
        ));
    }
    ChangePasswordValidator.validate(&request).into_result()?;

    let user = load_user(&state, id).await?;
    let digest = user.password_hash.as_deref().ok_or_else(|| {
        ApiError::ValidationFailed("Cannot change password for OAuth users".to_string())
    })?;

    if !state.hasher.verify(&request.current_password, digest).await {
        info!(user_id = id, "Password change rejected: wrong current password");
        return Err(ApiError::InvalidCredentials);
    }

    let new_hash = state.hasher.hash(&request.new_password).await?;
    let user = state
        .users
        .update_password(id, &new_hash)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = id, "Password changed");
    Ok(ApiResponse::ok("Password changed successfully", PublicUser::from(user)))
}

/// PATCH /api/user/toggle-status/:id - Set `is_active` on a user (admin)
///
/// Repeating a request leaves the account in the requested state.
pub async fn toggle_status(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateStatusRequest>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    ADMIN_ONLY.check(&authed, None)?;
    UpdateStatusValidator.validate(&request).into_result()?;
    let is_active = request.is_active.unwrap_or_default();

    if authed.id == id {
        return Err(ApiError::Forbidden(
            "You cannot change your own account status".to_string(),
        ));
    }

    let user = state
        .users
        .set_active(id, is_active)
        .await?
        .ok_or_else(user_not_found)?;

    info!(
        admin_user_id = authed.id,
        user_id = id,
        is_active = user.is_active,
        "User status updated"
    );
    Ok(ApiResponse::ok("User status updated successfully", PublicUser::from(user)))
}

/// DELETE /api/user/delete/:id - Delete a non-admin user (admin)
pub async fn delete_user(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    ADMIN_ONLY.check(&authed, None)?;

    let target = load_user(&state, id).await?;
    if target.role == Role::Admin {
        warn!(admin_user_id = authed.id, user_id = id, "Refusing to delete admin user");
        return Err(ApiError::Forbidden("Cannot delete admin users".to_string()));
    }

    if !state.users.delete(id).await? {
        return Err(user_not_found());
    }

    info!(admin_user_id = authed.id, user_id = id, "User deleted");
    Ok(ApiResponse::message("User deleted successfully"))
}
