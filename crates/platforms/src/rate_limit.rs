//! Request rate limiting for the HTTP port.
//!
//! [`RateLimitedFetcher`] wraps any [`HttpFetcher`] and makes every outgoing
//! request take a token from a bucket first. One status fetch can fan out
//! into many page requests, so the limit is enforced here rather than per
//! channel poll.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use crate::extractor::error::FetchError;
use crate::http::{HttpFetcher, HttpRequest, HttpResponse};

/// Sustained requests per second plus a burst allowance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    requests_per_second: f64,
    burst: u32,
}

impl RateLimit {
    /// `rps` requests per second, bursting up to twice that (at least one).
    ///
    /// Returns `None` unless `rps` is finite and positive.
    pub fn per_second(rps: f64) -> Option<Self> {
        if !rps.is_finite() || rps <= 0.0 {
            return None;
        }
        let burst = (rps * 2.0).ceil().min(u32::MAX as f64) as u32;
        Some(Self {
            requests_per_second: rps,
            burst: burst.max(1),
        })
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst.max(1);
        self
    }

    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}

#[derive(Debug)]
struct Bucket {
    limit: RateLimit,
    tokens: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn full(limit: RateLimit) -> Self {
        Self {
            limit,
            tokens: limit.burst as f64,
            refilled_at: Instant::now(),
        }
    }

    /// Take one token, or say how long until one accrues.
    fn take(&mut self, now: Instant) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.limit.requests_per_second)
            .min(self.limit.burst as f64);
        self.refilled_at = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64(
                (1.0 - self.tokens) / self.limit.requests_per_second,
            ))
        }
    }
}

/// Transport decorator that throttles every request through one bucket.
pub struct RateLimitedFetcher {
    inner: Arc<dyn HttpFetcher>,
    limit: RateLimit,
    bucket: Mutex<Bucket>,
}

impl RateLimitedFetcher {
    pub fn new(inner: Arc<dyn HttpFetcher>, limit: RateLimit) -> Self {
        Self {
            inner,
            limit,
            bucket: Mutex::new(Bucket::full(limit)),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait for a token and return how long that took.
    ///
    /// The lock is never held across the sleep, so dropping a waiting
    /// request leaves the bucket untouched.
    async fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = match self.bucket.lock().await.take(Instant::now()) {
                Ok(()) => return waited,
                Err(wait) => wait,
            };
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }
}

#[async_trait]
impl HttpFetcher for RateLimitedFetcher {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let waited = self.acquire().await;
        if !waited.is_zero() {
            trace!(url = %request.url, waited = ?waited, "Request rate limited");
        }
        self.inner.fetch(request).await
    }
}
