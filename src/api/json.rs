//! JSON body extractor that reports decode failures as validation errors.

use axum::extract::FromRequest;

use super::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
