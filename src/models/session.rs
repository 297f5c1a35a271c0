// SPDX-License-Identifier: MIT

//! Server-side session record bridging the OAuth redirect hop.

use serde::{Deserialize, Serialize};

/// Transient session state stored in Firestore.
///
/// Created when a client initiates the OAuth flow, consumed by the
/// callback, and otherwise garbage-collected by TTL. Never used for
/// ordinary API authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session id (also the document id; mirrored here for purge queries)
    pub id: String,
    /// CSRF state expected back from the provider
    pub oauth_state: String,
    /// Where to send the user agent after a successful handshake
    pub redirect_uri: Option<String>,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Hard expiry (RFC 3339); reads past this delete the record
    pub expires_at: String,
}
