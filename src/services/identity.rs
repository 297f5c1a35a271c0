// SPDX-License-Identifier: MIT

//! Create-or-update of identities from OAuth provider profiles.
//!
//! Matching is strictly by provider id, never by email alone, so two
//! provider accounts sharing an email address are never silently merged.

use crate::db::{CreateUserOutcome, Db};
use crate::error::AppError;
use crate::models::{normalize_email, User};
use crate::services::google::GoogleProfile;
use ring::rand::SecureRandom;

/// Bounded retries for losing the provider-index race against a
/// concurrent first login whose user document is not yet visible.
const MAX_CREATE_ATTEMPTS: usize = 3;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    /// True when this callback created the identity
    pub created: bool,
}

/// Login failures that the OAuth callback maps to coded redirects.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("provider profile carries no email address")]
    NoEmail,
    /// The email already belongs to an identity with a different provider
    /// id. Surfaced as a coded failure instead of an opaque duplicate-key
    /// error.
    #[error("email {0} is already linked to another account")]
    EmailTaken(String),
    #[error(transparent)]
    Db(#[from] AppError),
}

/// Applies the provider profile to the identity store.
#[derive(Clone)]
pub struct IdentityService {
    db: Db,
}

impl IdentityService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create or update the identity for a provider profile.
    ///
    /// Known provider id: refresh name/avatar from the fresh profile.
    /// Unknown: create with default preferences, onboarding and stats.
    pub async fn login_or_register(
        &self,
        profile: &GoogleProfile,
    ) -> Result<LoginOutcome, IdentityError> {
        let email = profile.email.as_deref().ok_or(IdentityError::NoEmail)?;
        let email = normalize_email(email);

        for attempt in 0..MAX_CREATE_ATTEMPTS {
            if let Some(mut user) = self.db.find_user_by_google_id(&profile.id).await? {
                user.name = profile.name.clone();
                user.avatar_url = profile.avatar_url.clone();
                user.updated_at = chrono::Utc::now().to_rfc3339();
                self.db.update_user(&user).await?;

                tracing::info!(user_id = %user.id, "Returning user, profile refreshed");
                return Ok(LoginOutcome {
                    user,
                    created: false,
                });
            }

            let now = chrono::Utc::now().to_rfc3339();
            let user = User::new(
                new_user_id()?,
                profile.id.clone(),
                email.clone(),
                profile.name.clone(),
                profile.avatar_url.clone(),
                &now,
            );

            match self.db.create_user(&user).await? {
                CreateUserOutcome::Created => {
                    tracing::info!(user_id = %user.id, "New user created");
                    return Ok(LoginOutcome {
                        user,
                        created: true,
                    });
                }
                CreateUserOutcome::ProviderExists => {
                    // Lost the race; loop to read the winner's record.
                    tracing::debug!(attempt, "Provider id claimed concurrently, re-reading");
                    continue;
                }
                CreateUserOutcome::EmailExists => {
                    return Err(IdentityError::EmailTaken(email));
                }
            }
        }

        Err(IdentityError::Db(AppError::Database(
            "concurrent signup did not converge".to_string(),
        )))
    }
}

/// Random 128-bit internal user id.
fn new_user_id() -> Result<String, AppError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
    Ok(hex::encode(bytes))
}
