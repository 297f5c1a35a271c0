// SPDX-License-Identifier: MIT

//! API routes for authenticated users.
//!
//! All routes here run behind `require_auth` (applied in routes/mod.rs);
//! routes addressing a specific user additionally run the ownership
//! check, which is a separate policy from authentication.

use crate::error::{ApiResponse, AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::middleware::ensure_owner;
use crate::models::{OnboardingState, Preferences, UsageStats, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require authentication via bearer token).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/users/{id}/onboarding", put(update_onboarding))
        .route("/api/users/{id}/preferences", put(update_preferences))
        .route("/api/users/{id}", delete(delete_account))
}

/// Full identity payload for the owner themselves.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub onboarding: OnboardingState,
    pub preferences: Preferences,
    pub stats: UsageStats,
    pub joined_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            onboarding: user.onboarding,
            preferences: user.preferences.clone(),
            stats: user.stats.clone(),
            joined_at: user.joined_at.clone(),
        }
    }
}

/// Get the current user's profile.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<ApiResponse<UserResponse>> {
    ApiResponse::ok(UserResponse::from(&auth.user))
}

#[derive(Deserialize)]
struct OnboardingUpdate {
    state: OnboardingState,
}

/// Advance the user's onboarding state.
///
/// Onboarding is monotonic: equal states are an idempotent no-op,
/// backward moves are rejected.
async fn update_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(body): Json<OnboardingUpdate>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    ensure_owner(&auth, &user_id)?;

    let mut user = auth.user;
    if body.state.rank() < user.onboarding.rank() {
        return Err(AppError::Validation(
            "onboarding state cannot move backward".to_string(),
        ));
    }

    if body.state != user.onboarding {
        user.onboarding = body.state;
        user.updated_at = chrono::Utc::now().to_rfc3339();
        state.db.update_user(&user).await?;
    }

    Ok(ApiResponse::ok(UserResponse::from(&user)))
}

/// Replace the user's notification preferences.
async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(body): Json<Preferences>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    ensure_owner(&auth, &user_id)?;

    if body.reminder_hour > 23 {
        return Err(AppError::Validation(
            "reminder_hour must be between 0 and 23".to_string(),
        ));
    }

    let mut user = auth.user;
    user.preferences = body;
    user.updated_at = chrono::Utc::now().to_rfc3339();
    state.db.update_user(&user).await?;

    Ok(ApiResponse::ok(UserResponse::from(&user)))
}

#[derive(Serialize)]
pub struct DeleteAccountResponse {
    pub message: String,
}

/// Delete the user's account, including the uniqueness index entries.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<DeleteAccountResponse>>> {
    ensure_owner(&auth, &user_id)?;

    tracing::info!(user_id = %auth.user.id, "User-initiated account deletion");
    state.db.delete_user(&auth.user).await?;

    Ok(ApiResponse::ok(DeleteAccountResponse {
        message: "Account deleted".to_string(),
    }))
}
