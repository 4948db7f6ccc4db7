//! Authentication request and response models

use serde::{Deserialize, Serialize};

use crate::users::models::PublicUser;

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of register, login and `/me` responses
#[derive(Serialize, Deserialize, Debug)]
pub struct AuthPayload {
    pub user: PublicUser,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    pub access_token: String,
    pub user: PublicUser,
}

/// Query string on the provider's redirect back to us
#[derive(Deserialize, Debug, Default)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
