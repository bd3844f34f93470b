/// Bearer token extraction
///
/// Callers authenticate upstream; we only lift the token out of the
/// `Authorization` header so it can be forwarded to collaborators.

use crate::workflow::types::BearerToken;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::Json,
};
use serde_json::{json, Value};

/// Credentials of a `Bearer` authorization value. The scheme name is
/// case-insensitive (RFC 7235).
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, credentials) = value.trim_start().split_once(' ')?;
    let credentials = credentials.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !credentials.is_empty()).then_some(credentials)
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_credentials);

        match token {
            Some(token) => Ok(BearerToken::new(token)),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "message": "missing or malformed bearer token",
                    "statusCode": 401,
                })),
            )),
        }
    }
}
