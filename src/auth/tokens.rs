//! Access and refresh token issuance and verification
//!
//! Both token classes are HS256 JWTs carrying the same identity claims. They
//! are signed with different secrets and carry different audiences, so a
//! token of one class never verifies as the other.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::common::config::AppConfig;
use crate::common::ApiError;
use crate::users::models::{Role, User};

pub const ISSUER: &str = "lms-app";
pub const ACCESS_AUDIENCE: &str = "lms-app-users";
pub const REFRESH_AUDIENCE: &str = "lms-app-refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Access,
    Refresh,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token malformed")]
    Malformed,

    #[error("token verification failed")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Map a verification failure onto the API taxonomy.
    pub fn into_api_error(self, class: TokenClass) -> ApiError {
        match self {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Malformed => ApiError::TokenMalformed(class),
            TokenError::Invalid => ApiError::TokenInvalid,
            TokenError::Signing(msg) => ApiError::InternalServer(msg),
        }
    }
}

/// Identity fields embedded in a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    audience: &'static str,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, audience: &'static str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            audience,
            ttl,
        }
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenIssuer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            access: SigningKeys::new(&config.jwt_secret, ACCESS_AUDIENCE, config.access_token_ttl),
            refresh: SigningKeys::new(
                &config.jwt_refresh_secret,
                REFRESH_AUDIENCE,
                config.refresh_token_ttl,
            ),
        }
    }

    fn keys(&self, class: TokenClass) -> &SigningKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    pub fn ttl(&self, class: TokenClass) -> Duration {
        self.keys(class).ttl
    }

    pub fn issue_access_token(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.issue_at(TokenClass::Access, subject, Utc::now())
    }

    pub fn issue_refresh_token(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.issue_at(TokenClass::Refresh, subject, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`.
    pub fn issue_at(
        &self,
        class: TokenClass,
        subject: &TokenSubject,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let keys = self.keys(class);
        let iat = issued_at.timestamp().max(0) as u64;
        let claims = Claims {
            id: subject.id,
            email: subject.email.clone(),
            role: subject.role,
            iss: ISSUER.to_string(),
            aud: keys.audience.to_string(),
            iat,
            exp: iat + keys.ttl.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
            error!(error = %e, user_id = subject.id, "JWT encoding error");
            TokenError::Signing(e.to_string())
        })
    }

    pub fn verify(&self, token: &str, class: TokenClass) -> Result<Claims, TokenError> {
        let keys = self.keys(class);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[keys.audience]);

        decode::<Claims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, token_class = ?class, "JWT verification failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidToken
                    | ErrorKind::InvalidSignature
                    | ErrorKind::Base64(_)
                    | ErrorKind::Json(_)
                    | ErrorKind::Utf8(_) => TokenError::Malformed,
                    _ => TokenError::Invalid,
                }
            })
    }
}
