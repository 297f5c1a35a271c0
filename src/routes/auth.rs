// SPDX-License-Identifier: MIT

//! Google OAuth authentication routes.
//!
//! The handshake bridges two redirects: `/auth/google` stores the
//! client's return address in a server-side session (keyed by a signed
//! cookie) and sends the user agent to Google; the callback consumes the
//! session, creates or updates the identity, mints a bearer token and
//! redirects to the mobile client's custom URI scheme. Every callback
//! failure becomes a coded redirect, never a raw error page.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Config, MIN_SECRET_LEN};
use crate::error::{ApiResponse, Result};
use crate::middleware::auth::AuthUser;
use crate::models::PublicUser;
use crate::services::identity::IdentityError;
use crate::services::session::{SESSION_COOKIE, SESSION_TTL_HOURS};
use crate::AppState;

/// Path the session cookie is scoped to.
const CALLBACK_PATH: &str = "/auth/google/callback";

/// Coded failure reasons carried to `/auth/error`.
mod failure {
    pub const AUTHENTICATION_FAILED: &str = "authentication_failed";
    pub const TOKEN_GENERATION_FAILED: &str = "token_generation_failed";
    pub const USER_CREATION_FAILED: &str = "user_creation_failed";
    pub const NO_EMAIL_FROM_PROVIDER: &str = "no_email_from_provider";
    pub const ACCOUNT_EXISTS: &str = "account_exists";
}

/// Public auth routes (no bearer token).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/error", get(auth_error))
        .route("/auth/status", get(auth_status))
}

/// Auth routes gated by `require_auth` (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/verify", post(auth_verify))
        .route("/auth/logout", post(auth_logout))
}

/// Query parameters for starting the OAuth flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Where to send the user agent after the handshake completes.
    /// Falls back to the configured mobile scheme when absent or unsafe.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start the OAuth flow: create a session, redirect to Google.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<AuthStartParams>,
) -> Result<(CookieJar, Redirect)> {
    let redirect_uri = params
        .redirect_uri
        .and_then(|raw| sanitize_redirect_uri(&raw, &state.config));

    let (session, cookie_value) = state.sessions.begin(redirect_uri).await?;
    let consent_url = state.google.authorize_url(&session.oauth_state);

    tracing::info!(
        redirect_uri = ?session.redirect_uri,
        "Starting OAuth flow, redirecting to Google"
    );

    let jar = jar.add(session_cookie(&state.config, cookie_value));
    Ok((jar, Redirect::temporary(&consent_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: consume the session, exchange the code, create or
/// update the identity, mint a token, redirect to the client.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    // The session is one-shot: consumed (and its cookie cleared) no
    // matter how the rest of the callback goes.
    let session = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match state.sessions.consume(cookie.value()).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load OAuth session");
                None
            }
        },
        None => None,
    };
    let jar = jar.remove(removal_cookie(&state.config));

    let Some(session) = session else {
        tracing::warn!("OAuth callback without a live session");
        return (jar, error_redirect(failure::AUTHENTICATION_FAILED));
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return (jar, error_redirect(failure::AUTHENTICATION_FAILED));
    }

    let (Some(code), Some(returned_state)) = (params.code, params.state) else {
        tracing::warn!("OAuth callback missing code or state");
        return (jar, error_redirect(failure::AUTHENTICATION_FAILED));
    };

    if returned_state != session.oauth_state {
        tracing::warn!("OAuth state mismatch, possible CSRF");
        return (jar, error_redirect(failure::AUTHENTICATION_FAILED));
    }

    let profile = match state.google.exchange_code(&code).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "Code exchange failed");
            return (jar, error_redirect(failure::AUTHENTICATION_FAILED));
        }
    };

    let outcome = match state.identity.login_or_register(&profile).await {
        Ok(outcome) => outcome,
        Err(IdentityError::NoEmail) => {
            tracing::warn!(google_id = %profile.id, "Provider profile has no email");
            return (jar, error_redirect(failure::NO_EMAIL_FROM_PROVIDER));
        }
        Err(IdentityError::EmailTaken(email)) => {
            tracing::warn!(email = %email, "Email already linked to another account");
            return (jar, error_redirect(failure::ACCOUNT_EXISTS));
        }
        Err(IdentityError::Db(e)) => {
            tracing::error!(error = %e, "Persisting identity failed");
            return (jar, error_redirect(failure::USER_CREATION_FAILED));
        }
    };

    // Token must reflect the persisted identity's final id.
    let token = match state.tokens.issue(&outcome.user) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Token minting failed");
            return (jar, error_redirect(failure::TOKEN_GENERATION_FAILED));
        }
    };

    let user_json = match serde_json::to_string(&PublicUser::from(&outcome.user)) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Serializing user payload failed");
            return (jar, error_redirect(failure::TOKEN_GENERATION_FAILED));
        }
    };

    let base = session
        .redirect_uri
        .unwrap_or_else(|| default_client_target(&state.config));

    tracing::info!(
        user_id = %outcome.user.id,
        created = outcome.created,
        "OAuth login complete"
    );

    (
        jar,
        Redirect::temporary(&client_redirect(&base, &token, &user_json)),
    )
}

#[derive(Deserialize)]
pub struct AuthErrorParams {
    #[serde(default)]
    message: Option<String>,
}

/// Hand a coded failure back to the mobile client via its URI scheme.
async fn auth_error(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthErrorParams>,
) -> Redirect {
    let reason = params.message.unwrap_or_default();
    let (text, code) = describe_failure(&reason);

    let target = format!(
        "{}://auth/error?error={}&code={}",
        state.config.mobile_scheme,
        urlencoding::encode(text),
        code
    );
    Redirect::temporary(&target)
}

/// Response for `/auth/verify`.
#[derive(Serialize)]
pub struct VerifyResponse {
    pub user: PublicUser,
    #[serde(rename = "tokenValid")]
    pub token_valid: bool,
}

/// Confirm a stored token is still good and return the live identity.
async fn auth_verify(Extension(auth): Extension<AuthUser>) -> Json<ApiResponse<VerifyResponse>> {
    ApiResponse::ok(VerifyResponse {
        user: PublicUser::from(&auth.user),
        token_valid: true,
    })
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Symbolic logout: tokens are stateless, so the real effect is the
/// client discarding its stored token.
async fn auth_logout(Extension(auth): Extension<AuthUser>) -> Json<ApiResponse<LogoutResponse>> {
    tracing::info!(user_id = %auth.user.id, "User logged out");
    ApiResponse::ok(LogoutResponse {
        message: "Logged out".to_string(),
    })
}

/// Response for `/auth/status`: configuration flags only, no secrets.
#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub oauth_configured: bool,
    pub jwt_configured: bool,
}

async fn auth_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<AuthStatusResponse>> {
    let config = &state.config;
    ApiResponse::ok(AuthStatusResponse {
        oauth_configured: !config.google_client_id.is_empty()
            && !config.google_client_secret.is_empty(),
        jwt_configured: config.jwt_secret.len() >= MIN_SECRET_LEN,
    })
}

// ─── Helpers ─────────────────────────────────────────────────

/// Accept a client-supplied redirect target only when it points at the
/// mobile scheme, an allowed origin, or local development.
fn sanitize_redirect_uri(raw: &str, config: &Config) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mobile_prefix = format!("{}://", config.mobile_scheme);
    let allowed = raw.starts_with(&mobile_prefix)
        || config.allowed_origins.iter().any(|o| raw.starts_with(o.as_str()))
        || raw.starts_with("http://localhost")
        || raw.starts_with("http://127.0.0.1");

    if allowed {
        Some(raw.to_string())
    } else {
        tracing::warn!(redirect_uri = raw, "Rejecting unsafe redirect_uri");
        None
    }
}

/// Default post-auth target when the client supplied no redirect URI.
fn default_client_target(config: &Config) -> String {
    format!("{}://auth", config.mobile_scheme)
}

/// Append token and user payload to the client redirect target.
fn client_redirect(base: &str, token: &str, user_json: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}token={}&user={}",
        base,
        sep,
        urlencoding::encode(token),
        urlencoding::encode(user_json)
    )
}

fn error_redirect(reason: &str) -> Redirect {
    Redirect::temporary(&format!("/auth/error?message={}", reason))
}

/// Map a failure reason to client-facing text and an envelope code.
fn describe_failure(reason: &str) -> (&'static str, &'static str) {
    match reason {
        failure::NO_EMAIL_FROM_PROVIDER => ("Google did not share an email address", "AUTH_ERROR"),
        failure::ACCOUNT_EXISTS => (
            "This email is already linked to a different sign-in",
            "USER_EXISTS",
        ),
        failure::TOKEN_GENERATION_FAILED => ("Could not create a login token", "AUTH_ERROR"),
        failure::USER_CREATION_FAILED => ("Could not create your account", "AUTH_ERROR"),
        _ => ("Sign-in failed", "AUTH_ERROR"),
    }
}

/// Session cookie scoped to the OAuth callback path.
fn session_cookie(config: &Config, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_path(CALLBACK_PATH);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(time::Duration::hours(SESSION_TTL_HOURS));
    if config.app_env.is_production() {
        cookie.set_secure(true);
    }
    cookie
}

/// Removal cookie with attributes matching the creation cookie.
fn removal_cookie(config: &Config) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path(CALLBACK_PATH);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    if config.app_env.is_production() {
        cookie.set_secure(true);
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::test_default()
    }

    #[test]
    fn test_sanitize_accepts_mobile_scheme() {
        let uri = sanitize_redirect_uri("daybook://auth", &config());
        assert_eq!(uri, Some("daybook://auth".to_string()));
    }

    #[test]
    fn test_sanitize_accepts_allowed_origin() {
        let uri = sanitize_redirect_uri("http://localhost:5173/callback", &config());
        assert_eq!(uri, Some("http://localhost:5173/callback".to_string()));
    }

    #[test]
    fn test_sanitize_rejects_foreign_target() {
        assert_eq!(sanitize_redirect_uri("https://evil.example/phish", &config()), None);
        assert_eq!(sanitize_redirect_uri("otherapp://auth", &config()), None);
        assert_eq!(sanitize_redirect_uri("  ", &config()), None);
    }

    #[test]
    fn test_client_redirect_separator() {
        let url = client_redirect("daybook://auth", "tok", "{}");
        assert!(url.starts_with("daybook://auth?token=tok&user="));

        let url = client_redirect("daybook://auth?src=login", "tok", "{}");
        assert!(url.starts_with("daybook://auth?src=login&token=tok&user="));
    }

    #[test]
    fn test_client_redirect_encodes_payload() {
        let url = client_redirect("daybook://auth", "a b", r#"{"name":"A B"}"#);
        assert!(url.contains("token=a%20b"));
        assert!(!url.contains('"'));
    }

    #[test]
    fn test_describe_failure_codes() {
        assert_eq!(describe_failure(failure::ACCOUNT_EXISTS).1, "USER_EXISTS");
        assert_eq!(
            describe_failure(failure::NO_EMAIL_FROM_PROVIDER).1,
            "AUTH_ERROR"
        );
        assert_eq!(describe_failure("anything-else").1, "AUTH_ERROR");
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(&config(), "value".to_string());
        assert_eq!(cookie.path(), Some(CALLBACK_PATH));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        // Development config: no Secure attribute
        assert_ne!(cookie.secure(), Some(true));
    }
}
