// SPDX-License-Identifier: MIT

//! Identity create-or-update semantics against the Firestore emulator.
//!
//! Run with FIRESTORE_EMULATOR_HOST set; skipped otherwise.

use daybook_api::db::Db;
use daybook_api::models::OnboardingState;
use daybook_api::services::{GoogleProfile, IdentityError, IdentityService};

mod common;

fn profile(google_id: &str, email: &str, name: &str) -> GoogleProfile {
    GoogleProfile {
        id: google_id.to_string(),
        name: name.to_string(),
        email: Some(email.to_string()),
        avatar_url: Some("https://img.example/a.png".to_string()),
    }
}

async fn service() -> (IdentityService, Db) {
    let db = common::test_db().await;
    (IdentityService::new(db.clone()), db)
}

#[tokio::test]
async fn test_first_login_creates_with_defaults() {
    require_emulator!();
    let (service, _db) = service().await;

    let suffix = common::unique_suffix();
    let outcome = service
        .login_or_register(&profile(
            &format!("g-{}", suffix),
            &format!("first-{}@example.com", suffix),
            "First User",
        ))
        .await
        .expect("first login should create");

    assert!(outcome.created);
    assert_eq!(outcome.user.stats.total_entries, 0);
    assert_eq!(outcome.user.stats.streak_days, 0);
    assert_eq!(outcome.user.onboarding, OnboardingState::Welcome);
    assert_eq!(outcome.user.email, format!("first-{}@example.com", suffix));
}

#[tokio::test]
async fn test_repeat_login_updates_in_place() {
    require_emulator!();
    let (service, db) = service().await;

    let suffix = common::unique_suffix();
    let google_id = format!("g-{}", suffix);
    let email = format!("repeat-{}@example.com", suffix);

    let first = service
        .login_or_register(&profile(&google_id, &email, "Old Name"))
        .await
        .unwrap();
    assert!(first.created);

    let second = service
        .login_or_register(&profile(&google_id, &email, "New Name"))
        .await
        .unwrap();

    assert!(!second.created);
    assert_eq!(second.user.id, first.user.id);
    assert_eq!(second.user.name, "New Name");

    // No second record: the provider index still resolves to one user.
    let stored = db
        .find_user_by_google_id(&google_id)
        .await
        .unwrap()
        .expect("user should exist");
    assert_eq!(stored.id, first.user.id);
    assert_eq!(stored.name, "New Name");
}

#[tokio::test]
async fn test_email_normalization_on_create() {
    require_emulator!();
    let (service, _db) = service().await;

    let suffix = common::unique_suffix();
    let outcome = service
        .login_or_register(&profile(
            &format!("g-{}", suffix),
            &format!("  Mixed-{}@Example.COM ", suffix),
            "Mixed Case",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.user.email, format!("mixed-{}@example.com", suffix));
}

#[tokio::test]
async fn test_cross_provider_email_collision_is_coded() {
    require_emulator!();
    let (service, _db) = service().await;

    let suffix = common::unique_suffix();
    let email = format!("shared-{}@example.com", suffix);

    service
        .login_or_register(&profile(&format!("g-a-{}", suffix), &email, "Owner"))
        .await
        .expect("first create should succeed");

    // Same email, different provider id: a meaningful error, not an
    // opaque duplicate-key failure.
    let err = service
        .login_or_register(&profile(&format!("g-b-{}", suffix), &email, "Intruder"))
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::EmailTaken(_)));
}

#[tokio::test]
async fn test_concurrent_first_logins_converge() {
    require_emulator!();
    let (service, db) = service().await;

    let suffix = common::unique_suffix();
    let google_id = format!("g-{}", suffix);
    let email = format!("race-{}@example.com", suffix);
    let p = profile(&google_id, &email, "Racer");

    let (a, b) = tokio::join!(service.login_or_register(&p), service.login_or_register(&p));

    // Both requests may succeed (one creates, the other converges), or
    // one may report a constraint error. Either way there must be
    // exactly one identity for this provider id.
    let ids: Vec<String> = [a, b]
        .into_iter()
        .filter_map(|r| r.ok())
        .map(|o| o.user.id)
        .collect();
    assert!(!ids.is_empty(), "at least one login must succeed");
    assert!(
        ids.windows(2).all(|w| w[0] == w[1]),
        "all successes must agree on the identity"
    );

    let stored = db
        .find_user_by_google_id(&google_id)
        .await
        .unwrap()
        .expect("exactly one user should exist");
    assert_eq!(stored.id, ids[0]);
}
