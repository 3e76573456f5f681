//! Request extractors.

use std::convert::Infallible;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::ApiError;

pub const ANONYMOUS_ID_HEADER: &str = "x-anonymous-id";

/// The caller's self-asserted identity from `X-Anonymous-ID`. A caller
/// without one gets a fresh random identity, which responses echo back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousId(pub String);

impl AnonymousId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AnonymousId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let asserted = parts
            .headers
            .get(ANONYMOUS_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        Ok(match asserted {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        })
    }
}

/// `Json` whose rejection uses the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection uses the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection uses the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
