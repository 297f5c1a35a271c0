// SPDX-License-Identifier: MIT

//! Bearer token authentication middleware.
//!
//! `require_auth` gates protected routes with per-failure codes;
//! `optional_auth` runs the same pipeline but lets anonymous requests
//! through with no identity attached.

use crate::error::AppError;
use crate::models::User;
use crate::services::TokenError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated identity attached to the request context.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Middleware that requires a valid bearer token and a live identity.
///
/// Failure codes are distinct so the client can react per cause:
/// `NO_TOKEN`, `INVALID_TOKEN`, `TOKEN_EXPIRED`, `USER_NOT_FOUND`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Middleware variant for endpoints serving both anonymous and
/// authenticated callers: verification failures leave the identity
/// context empty instead of failing the request.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(auth_user) = authenticate(&state, request.headers()).await {
        request.extensions_mut().insert(auth_user);
    }
    next.run(request).await
}

/// Shared verification pipeline: extract bearer token, verify claims,
/// re-fetch the identity by the subject id.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers).ok_or(AppError::NoToken)?;

    let claims = state.tokens.verify(token).map_err(|e| match e {
        TokenError::Expired => AppError::TokenExpired,
        TokenError::Invalid | TokenError::Malformed | TokenError::Signing(_) => {
            AppError::InvalidToken
        }
    })?;

    // The token is stateless; a deleted account is a distinct condition
    // from a bad token.
    let user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(AuthUser { user })
}

/// Extract a non-empty bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token_wrong_auth_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
