//! Admission control for protecting system capacity.
//!
//! [`RateLimiter`] implements a per-identity sliding window: each identity
//! maps to the timestamps of its recent requests, old entries are purged on
//! every check, and a request is rejected once the window holds the
//! configured ceiling. The state is a single mutex-guarded map shared
//! process-wide — every request task goes through the one lock, which keeps
//! the purge-check-append sequence atomic.
//!
//! The limiter is in-process and best-effort: nothing is persisted and
//! instances do not share state, so multi-instance deployments need an
//! external store in front. That is a known limitation, not a correctness
//! target here.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::auth::bearer_key;
use crate::config::RateLimitConfig;
use crate::errors::{Error, Result};

/// Per-identity sliding-window request counter.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }

    /// Admission check for one request from `identity`: purge timestamps
    /// older than the window, reject at the ceiling, otherwise record now
    /// and admit.
    pub fn check(&self, identity: &str) -> Result<()> {
        let now = Instant::now();
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let timestamps = requests.entry(identity.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return Err(Error::TooManyRequests {
                message: format!(
                    "Rate limit exceeded: {} requests per {} seconds",
                    self.max_requests,
                    self.window.as_secs()
                ),
            });
        }

        timestamps.push(now);
        Ok(())
    }
}

/// Admission gate middleware. Runs before tracking, so a rejected request
/// produces no usage record and never reaches a handler.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let identity = request_identity(&request);
    state.limiter.check(&identity)?;
    Ok(next.run(request).await)
}

/// The identity a request is limited under: its API key when presented,
/// falling back to the caller's network address.
fn request_identity(request: &Request) -> String {
    if let Some(key) = bearer_key(request.headers()) {
        return key.to_string();
    }
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return forwarded.trim().to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
