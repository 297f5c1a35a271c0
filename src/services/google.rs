// SPDX-License-Identifier: MIT

//! Google OAuth client for the authorization-code exchange.
//!
//! Handles:
//! - Building the consent-screen URL (profile + email scopes only)
//! - Exchanging an authorization code for an access token
//! - Fetching the userinfo profile into a typed boundary struct

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Requested scopes: identity only, no extended access.
const SCOPES: &str = "openid email profile";

/// Typed provider profile at the OAuth boundary.
///
/// Internal code never touches the raw userinfo response.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    /// Stable Google account id
    pub id: String,
    pub name: String,
    /// May be absent when the account shares no email
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    token_url: String,
    userinfo_url: String,
    client_id: String,
    client_secret: String,
    /// Callback URL registered with Google (derived from the API base URL)
    redirect_uri: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Self {
        let redirect_uri = format!(
            "{}/auth/google/callback",
            config.api_url.trim_end_matches('/')
        );

        Self {
            http: reqwest::Client::new(),
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri,
        }
    }

    /// Build the consent-screen URL carrying the CSRF `state`.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for the provider profile.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleProfile, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("token exchange request failed: {}", e)))?;

        let grant: TokenGrant = check_response_json(response).await?;

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&grant.access_token)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("userinfo request failed: {}", e)))?;

        let info: UserInfo = check_response_json(response).await?;

        let email = info
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let name = display_name(info.name.as_deref(), email.as_deref());

        Ok(GoogleProfile {
            id: info.id,
            name,
            email,
            avatar_url: info.picture,
        })
    }
}

/// Access token from the code exchange. Refresh tokens are not requested.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
}

/// Raw userinfo response.
#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Auth(format!(
            "Google returned HTTP {}: {}",
            status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Auth(format!("invalid JSON from Google: {}", e)))
}

/// Pick a display name, falling back to the email's local part.
fn display_name(name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = name {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    email
        .and_then(|e| e.split('@').next())
        .filter(|local| !local.is_empty())
        .unwrap_or("Daybook User")
        .to_string()
}
