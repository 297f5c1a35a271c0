// SPDX-License-Identifier: MIT

//! Per-resource ownership enforcement.
//!
//! Distinct from authentication: `require_auth` answers "who are you",
//! this answers "may you touch this resource". Runs after Required-mode
//! authentication and fails with 403 instead of 401.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;

/// Check that the authenticated identity owns the resource.
pub fn ensure_owner(auth: &AuthUser, owner_id: &str) -> Result<(), AppError> {
    if auth.user.id != owner_id {
        tracing::warn!(
            user_id = %auth.user.id,
            owner_id,
            "Ownership check failed"
        );
        return Err(AppError::AccessDenied);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn auth_user(id: &str) -> AuthUser {
        AuthUser {
            user: User::new(
                id.to_string(),
                "g1".into(),
                "a@b.c".into(),
                "A".into(),
                None,
                "2024-01-15T12:00:00+00:00",
            ),
        }
    }

    #[test]
    fn test_owner_passes() {
        assert!(ensure_owner(&auth_user("u1"), "u1").is_ok());
    }

    #[test]
    fn test_non_owner_is_denied() {
        let err = ensure_owner(&auth_user("u1"), "u2").unwrap_err();
        assert!(matches!(err, AppError::AccessDenied));
        assert_eq!(err.code(), "ACCESS_DENIED");
    }
}
