//! Caller identity.
//!
//! Authentication happens in front of this service; the authenticated user id
//! arrives in the `X-User-Id` header.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CurrentUser(value.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("Missing user identity".to_string()))
    }
}
