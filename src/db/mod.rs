// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{CreateUserOutcome, Db};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Uniqueness index: document id = normalized email
    pub const USER_EMAILS: &str = "user_emails";
    /// Uniqueness index: document id = OAuth provider id
    pub const USER_PROVIDERS: &str = "user_providers";
    /// OAuth-hop session records (keyed by session id)
    pub const SESSIONS: &str = "sessions";
}
