// src/services/google.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::auth::oauth::{ExternalProfile, IdentityProvider, OAuthError};
use crate::common::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// OpenID Connect userinfo claims
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl From<UserInfo> for ExternalProfile {
    fn from(info: UserInfo) -> Self {
        Self {
            id: info.sub,
            emails: info.email.into_iter().collect(),
            display_name: info.name,
            given_name: info.given_name,
            family_name: info.family_name,
            photos: info.picture.into_iter().collect(),
        }
    }
}

/// Google sign-in over the authorization-code flow
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: GoogleConfig,
    client: Client,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, OAuthError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(OAuthError::OAuthFailed(format!("HTTP {}: {}", status, error_text)));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| OAuthError::SerializationError(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalProfile, OAuthError> {
        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            error!(status = %response.status(), "Userinfo request failed");
            return Err(OAuthError::RequestFailed(
                "Failed to get user info".to_string(),
            ));
        }

        let info = response
            .json::<UserInfo>()
            .await
            .map_err(|e| OAuthError::SerializationError(e.to_string()))?;
        Ok(info.into())
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            AUTHORIZE_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalProfile, OAuthError> {
        let access_token = self.fetch_access_token(code).await?;
        let profile = self.fetch_profile(&access_token).await?;
        info!(subject = %profile.id, "Fetched Google profile");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GoogleProvider {
        GoogleProvider::new(GoogleConfig {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            callback_url: "http://localhost:3000/api/auth/google/callback".to_string(),
        })
    }

    #[test]
    fn test_authorization_url() {
        let url = provider().authorization_url("abc123");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("response_type=code"));
        assert!(!url.contains("test_secret"));
    }

    #[test]
    fn test_userinfo_maps_to_profile() {
        let info: UserInfo = serde_json::from_str(
            r#"{"sub":"1234","email":"ann@x.com","name":"Ann Lee","given_name":"Ann","family_name":"Lee","picture":"http://img/a.png"}"#,
        )
        .unwrap();
        let profile = ExternalProfile::from(info);

        assert_eq!(profile.id, "1234");
        assert_eq!(profile.primary_email(), Some("ann@x.com"));
        assert_eq!(profile.local_name(), "Ann Lee");
        assert_eq!(profile.photo(), Some("http://img/a.png"));
    }

    #[test]
    fn test_userinfo_without_email() {
        let info: UserInfo = serde_json::from_str(r#"{"sub":"1234"}"#).unwrap();
        let profile = ExternalProfile::from(info);
        assert!(profile.primary_email().is_none());
        assert_eq!(profile.local_name(), "Unknown User");
    }
}
