// SPDX-License-Identifier: MIT

//! Daybook API Server
//!
//! Authentication, identity and authorization core for the Daybook
//! mobile journaling app.

use daybook_api::{
    config::Config,
    db::Db,
    middleware::RateLimiter,
    services::{GoogleOAuthClient, IdentityService, SessionStore, TokenService},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired OAuth sessions are garbage-collected.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration; refuse to serve with an invalid environment.
    // All violations are reported in one pass.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration is invalid; refusing to start:");
            for violation in e.violations() {
                eprintln!("  - {}", violation);
            }
            tracing::error!(problems = e.violations().len(), "Invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(port = config.port, "Starting Daybook API");

    // Initialize Firestore database
    let db = Db::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let tokens = TokenService::new(&config.jwt_secret);
    let google = GoogleOAuthClient::new(&config);
    let identity = IdentityService::new(db.clone());
    let sessions = SessionStore::new(db.clone(), config.session_secret.clone());
    let rate_limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit_window_secs),
        config.rate_limit_max_requests,
    );

    // Garbage-collect expired OAuth sessions in the background; the store
    // also expires lazily on read, so this only cleans abandoned handshakes.
    let purge_store = sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match purge_store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged expired OAuth sessions"),
                Err(e) => tracing::warn!(error = %e, "Session purge failed"),
            }
        }
    });

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        tokens,
        google,
        identity,
        sessions,
        rate_limiter,
    });

    // Build router
    let app = daybook_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("daybook_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
