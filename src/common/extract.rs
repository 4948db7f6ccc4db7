//! Body and path extractors whose rejections use the API envelope

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;

/// `Json<T>` that rejects with `ApiError::ValidationFailed`
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "Rejected request body");
                Err(ApiError::ValidationFailed(rejection.body_text()))
            }
        }
    }
}

/// `Path<T>` that rejects with `ApiError::ValidationFailed`
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(|rejection| ApiError::ValidationFailed(rejection.body_text()))
    }
}
