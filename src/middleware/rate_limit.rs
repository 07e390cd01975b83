//! Rate limiting middleware
//!
//! Fixed-window counter per client key, checked before authentication
//! runs. Counters are atomic; the key table is read-locked on the hot
//! path and write-locked only to insert a first-seen key, so no request
//! contends on another key's counter.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Stale keys are evicted once the table grows past this
const MAX_TRACKED_KEYS: usize = 10_000;

/// Per-client fixed-window counter
struct Counter {
    count: AtomicU64,
    /// Window start, epoch seconds
    window_start: AtomicU64,
}

impl Counter {
    fn new(now: u64) -> Self {
        Self {
            count: AtomicU64::new(0),
            window_start: AtomicU64::new(now),
        }
    }
}

/// Outcome of one budget check
#[derive(Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed {
        remaining: u64,
        /// Epoch seconds when the current window resets
        reset_at: u64,
    },
    Rejected {
        retry_after_secs: u64,
    },
}

/// Process-wide request budget, shared across worker tasks
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    counters: Arc<RwLock<HashMap<String, Arc<Counter>>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            counters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Count one request against `key` and decide whether it may proceed
    pub fn check(&self, key: &str) -> RateDecision {
        let now = epoch_secs();
        let counter = self.counter_for(key, now);

        // An elapsed window resets before counting. Only one task wins the
        // compare-exchange; late resets of the same window are no-ops.
        let started = counter.window_start.load(Ordering::Acquire);
        if now.saturating_sub(started) >= self.config.window_secs
            && counter
                .window_start
                .compare_exchange(started, now, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            counter.count.store(0, Ordering::Release);
        }

        let count = counter.count.fetch_add(1, Ordering::AcqRel) + 1;
        let window_start = counter.window_start.load(Ordering::Acquire);
        let reset_at = window_start + self.config.window_secs;

        if count > self.config.max_requests {
            RateDecision::Rejected {
                retry_after_secs: reset_at.saturating_sub(now).max(1),
            }
        } else {
            RateDecision::Allowed {
                remaining: self.config.max_requests - count,
                reset_at,
            }
        }
    }

    fn counter_for(&self, key: &str, now: u64) -> Arc<Counter> {
        if let Some(counter) = self.counters.read().unwrap().get(key) {
            return Arc::clone(counter);
        }

        let mut counters = self.counters.write().unwrap();
        if counters.len() >= MAX_TRACKED_KEYS {
            self.evict_stale(&mut counters, now);
        }
        Arc::clone(
            counters
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Counter::new(now))),
        )
    }

    /// Drop counters whose window has long elapsed; client cardinality is
    /// otherwise unbounded
    fn evict_stale(&self, counters: &mut HashMap<String, Arc<Counter>>, now: u64) {
        let horizon = self.config.window_secs;
        counters.retain(|_, counter| {
            now.saturating_sub(counter.window_start.load(Ordering::Acquire)) < horizon
        });
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.counters.read().unwrap().len()
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Client key: first `X-Forwarded-For` entry, else the remote address,
/// else a shared "unknown" bucket
fn client_key(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|addr| addr.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
///
/// Rejected requests never reach authentication. Accepted responses carry
/// `X-RateLimit-Remaining` and `X-RateLimit-Reset`; rejections are 429
/// with `Retry-After`.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let key = client_key(&request);
    match limiter.check(&key) {
        RateDecision::Rejected { retry_after_secs } => {
            metrics::counter!("clinigate_rate_limit_throttled_total").increment(1);
            tracing::warn!(client = %key, "Request rate limit exceeded");
            AppError::RateLimited { retry_after_secs }.into_response()
        }
        RateDecision::Allowed { remaining, reset_at } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert("x-ratelimit-remaining", value);
            }
            if let Ok(value) = HeaderValue::from_str(&reset_at.to_string()) {
                headers.insert("x-ratelimit-reset", value);
            }
            response
        }
    }
}
