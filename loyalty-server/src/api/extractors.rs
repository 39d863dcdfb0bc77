//! Custom Axum extractors for request authentication.
//!
//! Provides `AuthenticatedUser`, which verifies the signed session cookie
//! issued at registration or login. All cryptographic operations are
//! delegated to [`loyalty_sdk::signature`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use loyalty_sdk::signature::{MAX_SESSION_AGE, SESSION_COOKIE, SignatureError};
use uuid::Uuid;

use crate::state::AppState;

/// The user a request is authenticated as.
pub struct AuthenticatedUser(pub Uuid);

/// Errors that can occur during session verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing session cookie")]
    MissingSession,
    #[error("invalid session: {0}")]
    InvalidSession(#[from] SignatureError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingSession => "missing session cookie",
            AuthError::InvalidSession(_) => "invalid session",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AuthError::MissingSession)?;
        let user_id = state.signer.verify(token)?;
        Ok(AuthenticatedUser(user_id))
    }
}

/// Find the session token among the request cookies.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
}

/// `Set-Cookie` value carrying a freshly issued session token.
pub fn session_cookie(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={MAX_SESSION_AGE}"
    ))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("lang=en; user_id=abc.123.sig"),
        );
        assert_eq!(session_token(&headers), Some("abc.123.sig"));
    }

    #[test]
    fn test_session_token_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("user=someone"));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc.123.sig").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("user_id=abc.123.sig;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800"));
    }
}
