// SPDX-License-Identifier: MIT

//! Cookie-keyed session store for the OAuth redirect hop.
//!
//! The cookie value is `sid.signature` where the signature is
//! HMAC-SHA256 over the session id with the session secret, so a forged
//! or truncated cookie never reaches the database. The store is the
//! source of truth for session existence: reads past the TTL delete the
//! record and report it absent.

use crate::db::Db;
use crate::error::AppError;
use crate::models::SessionRecord;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::SecureRandom;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed session id across the OAuth hop.
pub const SESSION_COOKIE: &str = "daybook_oauth_session";
/// Session TTL: one day.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Session store backed by the `sessions` collection.
#[derive(Clone)]
pub struct SessionStore {
    db: Db,
    signing_key: Vec<u8>,
}

impl SessionStore {
    pub fn new(db: Db, signing_key: Vec<u8>) -> Self {
        Self { db, signing_key }
    }

    /// Create a session for a new OAuth handshake.
    ///
    /// Returns the record (CSRF state and redirect URI) and the signed
    /// cookie value to hand to the user agent.
    pub async fn begin(
        &self,
        redirect_uri: Option<String>,
    ) -> Result<(SessionRecord, String), AppError> {
        let sid = random_token(32)?;
        let oauth_state = random_token(16)?;

        let now = chrono::Utc::now();
        let record = SessionRecord {
            id: sid.clone(),
            oauth_state,
            redirect_uri,
            created_at: now.to_rfc3339(),
            expires_at: (now + chrono::Duration::hours(SESSION_TTL_HOURS)).to_rfc3339(),
        };

        self.db.put_session(&record).await?;
        let cookie_value = self.sign(&sid)?;

        Ok((record, cookie_value))
    }

    /// Read and delete the session named by a cookie value.
    ///
    /// One-shot by design: the record is removed whether or not it is
    /// still live, and an expired record is reported as absent.
    pub async fn consume(&self, cookie_value: &str) -> Result<Option<SessionRecord>, AppError> {
        let Some(sid) = self.verify_cookie(cookie_value) else {
            return Ok(None);
        };

        let Some(record) = self.db.get_session(&sid).await? else {
            return Ok(None);
        };

        self.db.delete_session(&sid).await?;

        if record.expires_at <= chrono::Utc::now().to_rfc3339() {
            tracing::debug!(session_id = %sid, "Session expired before callback");
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Garbage-collect sessions past their TTL.
    ///
    /// Returns how many records were removed.
    pub async fn purge_expired(&self) -> Result<usize, AppError> {
        let cutoff = chrono::Utc::now().to_rfc3339();
        let expired = self.db.expired_sessions(&cutoff).await?;
        if expired.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = expired.into_iter().map(|s| s.id).collect();
        self.db.delete_sessions(&ids).await?;
        Ok(ids.len())
    }

    /// Produce the signed cookie value for a session id.
    fn sign(&self, sid: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(sid.as_bytes());
        Ok(format!("{}.{}", sid, hex::encode(mac.finalize().into_bytes())))
    }

    /// Verify a cookie value and extract the session id.
    pub fn verify_cookie(&self, value: &str) -> Option<String> {
        let (sid, sig_hex) = value.rsplit_once('.')?;
        if sid.is_empty() {
            return None;
        }

        let presented = hex::decode(sig_hex).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.signing_key).ok()?;
        mac.update(sid.as_bytes());
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(presented.as_slice()).into() {
            Some(sid.to_string())
        } else {
            tracing::warn!("Session cookie signature mismatch");
            None
        }
    }
}

/// Random URL-safe token of `bytes` entropy bytes.
fn random_token(bytes: usize) -> Result<String, AppError> {
    let rng = ring::rand::SystemRandom::new();
    let mut buf = vec![0u8; bytes];
    rng.fill(&mut buf)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}
