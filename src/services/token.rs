// SPDX-License-Identifier: MIT

//! Bearer token issuing and verification.
//!
//! Tokens are stateless HS256 JWTs with a fixed issuer/audience binding.
//! Verification never touches storage; the caller re-fetches the identity
//! by the `sub` claim, so a deleted account surfaces as a distinct
//! "subject not found" condition even while the token still verifies.

use crate::models::User;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// `iss` claim on every issued token.
pub const ISSUER: &str = "daybook-api";
/// `aud` claim on every issued token.
pub const AUDIENCE: &str = "daybook-mobile";
/// Fixed validity window: 30 days.
pub const TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (internal user id)
    pub sub: String,
    /// Convenience claims so the client can render without a profile fetch
    pub email: String,
    pub name: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Token verification failures, distinguished at the API boundary.
///
/// The client reacts differently per variant: `Expired` prompts a silent
/// re-login, `Invalid`/`Malformed` force a hard logout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature, issuer or audience is invalid")]
    Invalid,
    #[error("token is structurally malformed")]
    Malformed,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Issues and verifies bearer tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for an identity. Pure computation, no side effects.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TokenError::Signing(format!("system time error: {}", e)))?
            .as_secs() as usize;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims.
    ///
    /// Verification is idempotent and touches no storage.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                _ => TokenError::Invalid,
            })
    }
}
