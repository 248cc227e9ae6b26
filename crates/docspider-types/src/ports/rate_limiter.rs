//! Per-host rate limiting port.
//!
//! Defines the interface a token-bucket implementation must provide.
//! Concrete adapters (e.g. `docspider-spider`'s `governor`-backed limiter)
//! implement this trait so the coordinator and workers can depend on the
//! interface instead of the concrete bucket type.

use async_trait::async_trait;
use std::time::Duration;

/// Statistics for a single domain's token bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostStats {
    pub request_count: u64,
    pub available_tokens: f64,
    pub last_request_age: Duration,
}

#[async_trait]
pub trait PerHostRateLimiter: Send + Sync {
    /// Block until a token is available for `domain`, or return `false` if
    /// the wait was cancelled.
    async fn wait(&self, domain: &str) -> bool;

    /// Non-blocking variant: consume a token only if one is immediately
    /// available.
    fn try_acquire(&self, domain: &str) -> bool;

    /// Statistics for a tracked domain, if any requests have been made.
    fn host_stats(&self, domain: &str) -> Option<HostStats>;

    /// Number of domains currently tracked.
    fn tracked_domains(&self) -> usize;
}
