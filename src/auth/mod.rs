//! Optional pre-shared-key gate in front of `/api`.
//!
//! The key may arrive as `x-api-key` or as an `Authorization: Bearer` token and is compared
//! in constant time. With no key configured every request passes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware for `axum::middleware::from_fn_with_state`.
pub async fn require_psk(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.config.api_psk.as_deref() else {
        return next.run(request).await;
    };

    match presented_key(request.headers()) {
        Some(key) if keys_match(key, expected) => next.run(request).await,
        Some(_) => AppError::Unauthorized("Invalid API key".to_string()).into_response(),
        None => AppError::Unauthorized("Missing API key".to_string()).into_response(),
    }
}

/// The key a caller presented, `x-api-key` taking precedence over a bearer token.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
}

fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("test-key-123", "test-key-123"));
        assert!(!keys_match("test-key-123", "test-key-124"));
        assert!(!keys_match("short", "much-longer-key"));
        assert!(!keys_match("", "not-empty"));
    }

    #[test]
    fn test_presented_key_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_key(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(presented_key(&headers), Some("tok"));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("key"));
        assert_eq!(presented_key(&headers), Some("key"));
    }

    #[test]
    fn test_basic_auth_is_not_a_key() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(presented_key(&headers), None);
    }
}
