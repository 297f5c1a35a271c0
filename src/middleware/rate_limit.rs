// SPDX-License-Identifier: MIT

//! Fixed-window rate limiting keyed by client address.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Above this many tracked clients, stale windows are swept on insert.
const MAX_TRACKED_CLIENTS: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

/// Per-client fixed-window counters.
///
/// Windows reset lazily on the first hit after they elapse; there is no
/// background sweeper beyond the size-triggered cleanup.
pub struct RateLimiter {
    hits: DashMap<String, Window>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            hits: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Record a hit for `key` and report whether it is within the limit.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();

        let allowed = {
            let mut entry = self.hits.entry(key.to_string()).or_insert(Window {
                started: now,
                count: 0,
            });

            if now.duration_since(entry.started) >= self.window {
                entry.started = now;
                entry.count = 0;
            }

            entry.count = entry.count.saturating_add(1);
            entry.count <= self.max_requests
        };

        if self.hits.len() > MAX_TRACKED_CLIENTS {
            self.hits
                .retain(|_, w| now.duration_since(w.started) < self.window);
        }

        allowed
    }
}

/// Middleware applying the limiter to every request.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);

    if !state.rate_limiter.check(&key) {
        tracing::warn!(client = %key, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    Ok(next.run(request).await)
}

/// Client key: first hop of x-forwarded-for, else the peer address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);

        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);

        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        assert!(limiter.check("5.6.7.8"));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(Duration::from_millis(40), 1);

        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));

        std::thread::sleep(Duration::from_millis(50));
        assert!(limiter.check("1.2.3.4"));
    }
}
