// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::oauth::IdentityProvider;
use crate::auth::password::{PasswordError, PasswordHasher};
use crate::auth::session::SessionStore;
use crate::auth::tokens::TokenIssuer;
use crate::users::UserStore;

/// Application state containing stores and configuration
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserStore,
    pub sessions: SessionStore,
    pub tokens: TokenIssuer,
    pub hasher: PasswordHasher,
    /// `None` when no identity provider is configured
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: AppConfig,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self, PasswordError> {
        let hasher = PasswordHasher::new(config.hash_params)?;
        Ok(Self {
            users: UserStore::new(db.clone()),
            sessions: SessionStore::new(db, config.session_ttl),
            tokens: TokenIssuer::new(&config),
            hasher,
            identity,
            config: Arc::new(config),
        })
    }
}
