//! Identity of the caller, as established by the fronting auth layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::ApiError;

/// Header carrying the authenticated username
pub const USER_HEADER: &str = "x-user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| CurrentUser(name.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}
