// SPDX-License-Identifier: MIT

//! User identity model for storage and API.

use serde::{Deserialize, Serialize};

/// Onboarding progress, a closed set that only advances forward.
///
/// The data layer never regresses this; handlers reject backward moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    Welcome,
    FirstStep,
    Intro,
    Completed,
}

impl OnboardingState {
    /// Position in the forward-only progression.
    pub fn rank(self) -> u8 {
        match self {
            OnboardingState::Welcome => 0,
            OnboardingState::FirstStep => 1,
            OnboardingState::Intro => 2,
            OnboardingState::Completed => 3,
        }
    }
}

/// Notification preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Send a daily journaling reminder
    pub daily_reminder: bool,
    /// Local hour (0-23) for the daily reminder
    pub reminder_hour: u8,
    /// Send a weekly digest email
    pub weekly_digest: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            daily_reminder: true,
            reminder_hour: 20,
            weekly_digest: false,
        }
    }
}

/// Usage statistics, maintained by the entry collaborator.
/// Counters are unsigned so they cannot go negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Total journal entries written
    #[serde(default)]
    pub total_entries: u32,
    /// Current writing streak in days
    #[serde(default)]
    pub streak_days: u32,
    /// Timestamp of the most recent entry (RFC 3339)
    #[serde(default)]
    pub last_entry_at: Option<String>,
}

/// User identity stored in Firestore.
///
/// Document id is the internal `id`. Uniqueness of `google_id` and `email`
/// is enforced by index collections keyed on those values (see `db`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Internal user id (random hex, also the document id)
    pub id: String,
    /// Google account id; unique when present
    pub google_id: Option<String>,
    /// Email address, lower-cased and trimmed; globally unique
    pub email: String,
    /// Display name, refreshed from the provider on every login
    pub name: String,
    /// Profile picture URL, refreshed from the provider on every login
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
    pub onboarding: OnboardingState,
    #[serde(default)]
    pub stats: UsageStats,
    /// When the user first signed in (RFC 3339)
    pub joined_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Build a brand-new identity with default preferences, onboarding and
    /// zeroed statistics.
    pub fn new(
        id: String,
        google_id: String,
        email: String,
        name: String,
        avatar_url: Option<String>,
        now: &str,
    ) -> Self {
        Self {
            id,
            google_id: Some(google_id),
            email: normalize_email(&email),
            name,
            avatar_url,
            preferences: Preferences::default(),
            onboarding: OnboardingState::Welcome,
            stats: UsageStats::default(),
            joined_at: now.to_string(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Compact identity payload embedded in the OAuth redirect and returned by
/// `/auth/verify`. Excludes preferences, stats and audit timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub onboarding: OnboardingState,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            onboarding: user.onboarding,
        }
    }
}

/// Canonical form for stored and looked-up email addresses.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
