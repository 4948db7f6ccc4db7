//! Third-party identity resolution
//!
//! [`IdentityProvider`] is the seam to an external OAuth provider; the
//! concrete provider is built once at startup and handed to handlers through
//! `AppState`. [`resolve_identity`] turns a verified external profile into a
//! local user by lookup, account linking, or creation.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::common::helpers::{is_unique_violation, safe_email_log};
use crate::common::ApiError;
use crate::users::models::{NewUser, Role, User};
use crate::users::UserStore;

/// Verified profile delivered by an identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalProfile {
    pub id: String,
    pub emails: Vec<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub photos: Vec<String>,
}

impl ExternalProfile {
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .map(|e| e.trim())
            .find(|e| !e.is_empty())
    }

    pub fn photo(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }

    /// Display name, then "given family", then a placeholder
    pub fn local_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }

        let composed = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if composed.is_empty() {
            "Unknown User".to_string()
        } else {
            composed
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Value stored in `users.oauth_provider`
    fn name(&self) -> &'static str;

    /// URL to send the browser to; `state` comes back on the callback.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange the callback's authorization code for a verified profile.
    async fn exchange_code(&self, code: &str) -> Result<ExternalProfile, OAuthError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("no email provided by identity provider")]
    MissingEmail,

    #[error("email already associated with a different provider")]
    ProviderConflict,

    #[error("failed to create user")]
    UserCreationFailed,

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::MissingEmail => ApiError::MissingEmail,
            BridgeError::ProviderConflict => ApiError::ProviderConflict,
            BridgeError::UserCreationFailed => ApiError::UserCreationFailed,
            BridgeError::Store(db) => ApiError::DatabaseError(db),
        }
    }
}

/// Resolve `profile` from `provider` to a local user.
///
/// 1. no email: `MissingEmail`
/// 2. known external id: that user
/// 3. known email without a linkage: link it, keeping role and name
/// 4. known email linked elsewhere: `ProviderConflict`
/// 5. otherwise create a password-less student account
pub async fn resolve_identity(
    users: &UserStore,
    provider: &str,
    profile: &ExternalProfile,
) -> Result<User, BridgeError> {
    let email = profile.primary_email().ok_or_else(|| {
        warn!(provider = provider, "External profile carries no email");
        BridgeError::MissingEmail
    })?;

    if let Some(user) = users.find_by_oauth_id(provider, &profile.id).await? {
        info!(user_id = user.id, provider = provider, "Resolved user by external id");
        return Ok(user);
    }

    if let Some(existing) = users.find_by_email(email).await? {
        if existing.oauth_id.is_some() {
            warn!(
                user_id = existing.id,
                email = %safe_email_log(email),
                existing_provider = ?existing.oauth_provider,
                provider = provider,
                "Email already linked to a different external identity"
            );
            return Err(BridgeError::ProviderConflict);
        }

        return match users
            .link_oauth(existing.id, provider, &profile.id, profile.photo())
            .await?
        {
            Some(linked) => {
                info!(user_id = linked.id, provider = provider, "Linked external identity to existing account");
                Ok(linked)
            }
            // Linked by a concurrent callback; accept it only if it is this identity.
            None => users
                .find_by_oauth_id(provider, &profile.id)
                .await?
                .ok_or(BridgeError::ProviderConflict),
        };
    }

    let new_user = NewUser {
        email: email.to_string(),
        name: profile.local_name(),
        password_hash: None,
        role: Role::Student,
        oauth_provider: Some(provider.to_string()),
        oauth_id: Some(profile.id.clone()),
        avatar_url: profile.photo().map(str::to_string),
    };

    match users.insert(&new_user).await {
        Ok(user) => {
            info!(
                user_id = user.id,
                email = %safe_email_log(&user.email),
                provider = provider,
                "Created user from external identity"
            );
            Ok(user)
        }
        Err(e) if is_unique_violation(&e) => {
            // Lost a race with a concurrent callback for the same identity.
            users
                .find_by_oauth_id(provider, &profile.id)
                .await?
                .ok_or(BridgeError::UserCreationFailed)
        }
        Err(e) => {
            error!(error = %e, provider = provider, "Failed to create user from external identity");
            Err(BridgeError::UserCreationFailed)
        }
    }
}
