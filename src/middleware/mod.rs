// SPDX-License-Identifier: MIT

//! Middleware modules (authentication, ownership, rate limiting, security).

pub mod auth;
pub mod ownership;
pub mod rate_limit;
pub mod security;

pub use auth::{optional_auth, require_auth, AuthUser};
pub use ownership::ensure_owner;
pub use rate_limit::RateLimiter;
