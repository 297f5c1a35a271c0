// SPDX-License-Identifier: MIT

//! Daybook API: backend core for the Daybook journaling app.
//!
//! This crate owns identity, bearer tokens, the Google OAuth handshake,
//! the OAuth-hop session bridge, and request authorization. Entry CRUD
//! and upload plumbing are external collaborators.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use middleware::RateLimiter;
use services::{GoogleOAuthClient, IdentityService, SessionStore, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub tokens: TokenService,
    pub google: GoogleOAuthClient,
    pub identity: IdentityService,
    pub sessions: SessionStore,
    pub rate_limiter: RateLimiter,
}
