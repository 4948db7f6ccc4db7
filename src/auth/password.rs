//! Password hashing (Argon2id)

use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _,
    PasswordVerifier as _, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::common::config::HashParams;
use crate::common::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),
}

/// Salted, adaptive one-way hashing with a configurable work factor.
///
/// Work runs on the blocking pool so a slow hash never stalls the runtime.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(params: HashParams) -> Result<Self, PasswordError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    pub async fn hash(&self, plaintext: &str) -> Result<String, ApiError> {
        let params = self.params.clone();
        let plaintext = plaintext.to_owned();

        let joined = tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Self::argon2(params)
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await;

        match joined {
            Ok(Ok(digest)) => Ok(digest),
            Ok(Err(e)) => {
                error!(error = %e, "Password hashing failed");
                Err(ApiError::InternalServer("password hashing failed".to_string()))
            }
            Err(e) => {
                error!(error = %e, "Password hashing task failed");
                Err(ApiError::InternalServer("password hashing failed".to_string()))
            }
        }
    }

    /// Constant-time check of `plaintext` against a stored PHC digest.
    ///
    /// Fails closed: an unparsable digest or a crashed task is a mismatch.
    pub async fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let plaintext = plaintext.to_owned();
        let digest = digest.to_owned();

        // Parameters are read from the digest itself, so the configured
        // work factor only affects new hashes.
        let joined = tokio::task::spawn_blocking(move || match PasswordHash::new(&digest) {
            Ok(parsed) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!(error = %e, "Stored password hash could not be parsed");
                false
            }
        })
        .await;

        joined.unwrap_or_else(|e| {
            error!(error = %e, "Password verification task failed");
            false
        })
    }
}
