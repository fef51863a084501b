//! Owner identification for dashboard requests

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
};

/// Header the dashboard sets once its session layer has authenticated the user
pub const OWNER_HEADER: &str = "x-user-id";

/// Extractor that reads the owner id from the `x-user-id` header
pub struct Owner(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        owner_from_headers(&parts.headers).map(Owner)
    }
}

fn owner_from_headers(headers: &HeaderMap) -> Result<i64, StatusCode> {
    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .filter(|id: &i64| *id > 0)
        .ok_or(StatusCode::UNAUTHORIZED)
}
