// SPDX-License-Identifier: MIT

use daybook_api::config::Config;
use daybook_api::db::Db;
use daybook_api::middleware::RateLimiter;
use daybook_api::routes::create_router;
use daybook_api::services::{GoogleOAuthClient, IdentityService, SessionStore, TokenService};
use daybook_api::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection against the emulator.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> Db {
    Db::new_mock()
}

/// Build an `AppState` from a config and database.
#[allow(dead_code)]
pub fn build_state(config: Config, db: Db) -> Arc<AppState> {
    let tokens = TokenService::new(&config.jwt_secret);
    let google = GoogleOAuthClient::new(&config);
    let identity = IdentityService::new(db.clone());
    let sessions = SessionStore::new(db.clone(), config.session_secret.clone());
    let rate_limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit_window_secs),
        config.rate_limit_max_requests,
    );

    Arc::new(AppState {
        config,
        db,
        tokens,
        google,
        identity,
        sessions,
        rate_limiter,
    })
}

/// Create a test app with offline mock database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

/// Create a test app with a custom config (offline mock database).
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = build_state(config, test_db_offline());
    (create_router(state.clone()), state)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let state = build_state(Config::test_default(), test_db().await);
    (create_router(state.clone()), state)
}

/// Read a response body as parsed JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not valid JSON")
}

/// Unique suffix so emulator state never collides across tests or runs.
#[allow(dead_code)]
pub fn unique_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    format!(
        "{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}
