//! Per-domain rate limiting using the `governor` crate.
//!
//! Generalizes the teacher's single, global `SimpleRateLimiter` (one bucket
//! for the whole process) into a map of one bucket per domain, which is
//! what a crawler that politeness-limits each site independently needs.

use dashmap::DashMap;
use docspider_types::ports::rate_limiter::{HostStats, PerHostRateLimiter};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct Bucket {
    limiter: GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>,
    requests: AtomicU64,
    created_at: Instant,
    last_request: std::sync::Mutex<Instant>,
}

/// A token bucket per domain, created on first reference with full
/// capacity. A background janitor caps the map size so a long-running
/// process that happens to see many domains doesn't grow unbounded — the
/// workload here is per-crawl and normally touches one or a small number
/// of domains.
pub struct DomainRateLimiter {
    buckets: Arc<DashMap<String, Arc<Bucket>>>,
    rate: NonZeroU32,
    burst: NonZeroU32,
    max_tracked_domains: usize,
}

impl DomainRateLimiter {
    /// `rate` tokens/second, `burst` bucket capacity.
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        let rate = NonZeroU32::new(rate_per_second.max(1.0).round() as u32)
            .unwrap_or(NonZeroU32::new(1).unwrap());
        let burst = NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::new(1).unwrap());
        Self {
            buckets: Arc::new(DashMap::new()),
            rate,
            burst,
            max_tracked_domains: 1000,
        }
    }

    fn bucket_for(&self, domain: &str) -> Arc<Bucket> {
        // `entry` holds the shard lock across the check-then-insert so two
        // workers hitting a new domain concurrently can't each build their
        // own bucket and briefly double the effective rate.
        self.buckets
            .entry(domain.to_string())
            .or_insert_with(|| {
                let quota = Quota::per_second(self.rate).allow_burst(self.burst);
                Arc::new(Bucket {
                    limiter: GovernorLimiter::direct(quota),
                    requests: AtomicU64::new(0),
                    created_at: Instant::now(),
                    last_request: std::sync::Mutex::new(Instant::now()),
                })
            })
            .clone()
    }

    /// Evict every tracked domain if the map has grown past the cap.
    /// Intended to run on an interval from a spawned janitor task.
    pub fn janitor_tick(&self) {
        if self.buckets.len() > self.max_tracked_domains {
            warn!(
                tracked = self.buckets.len(),
                cap = self.max_tracked_domains,
                "rate limiter map exceeded cap, evicting all buckets"
            );
            self.buckets.clear();
        }
    }
}

#[async_trait::async_trait]
impl PerHostRateLimiter for DomainRateLimiter {
    async fn wait(&self, domain: &str) -> bool {
        let bucket = self.bucket_for(domain);
        bucket.requests.fetch_add(1, Ordering::Relaxed);
        *bucket.last_request.lock().unwrap() = Instant::now();
        bucket.limiter.until_ready().await;
        debug!(domain = %domain, "rate limit permit acquired");
        true
    }

    fn try_acquire(&self, domain: &str) -> bool {
        let bucket = self.bucket_for(domain);
        match bucket.limiter.check() {
            Ok(_) => {
                bucket.requests.fetch_add(1, Ordering::Relaxed);
                *bucket.last_request.lock().unwrap() = Instant::now();
                true
            }
            Err(_) => false,
        }
    }

    fn host_stats(&self, domain: &str) -> Option<HostStats> {
        let bucket = self.buckets.get(domain)?;
        let _ = bucket.created_at;
        let available_tokens = match bucket.limiter.check() {
            Ok(_) => 1.0,
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                (1.0 - wait.as_secs_f64() * self.rate.get() as f64).max(0.0)
            }
        };
        Some(HostStats {
            request_count: bucket.requests.load(Ordering::Relaxed),
            available_tokens,
            last_request_age: bucket.last_request.lock().unwrap().elapsed(),
        })
    }

    fn tracked_domains(&self) -> usize {
        self.buckets.len()
    }
}

/// Spawns the background janitor described in §4.2: ticks every 60s,
/// evicting all buckets if the map grows past 1000 entries.
pub fn spawn_janitor(limiter: Arc<DomainRateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.janitor_tick();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buckets_are_created_lazily_per_domain() {
        let limiter = DomainRateLimiter::new(2.0, 2);
        assert_eq!(limiter.tracked_domains(), 0);
        limiter.wait("a.example.com").await;
        limiter.wait("b.example.com").await;
        assert_eq!(limiter.tracked_domains(), 2);
    }

    #[tokio::test]
    async fn try_acquire_respects_burst_then_fails() {
        let limiter = DomainRateLimiter::new(1.0, 2);
        assert!(limiter.try_acquire("d.example.com"));
        assert!(limiter.try_acquire("d.example.com"));
        assert!(!limiter.try_acquire("d.example.com"));
    }

    #[tokio::test]
    async fn domains_are_independent() {
        let limiter = DomainRateLimiter::new(1.0, 1);
        assert!(limiter.try_acquire("x.example.com"));
        assert!(!limiter.try_acquire("x.example.com"));
        // a different domain has its own bucket and is unaffected
        assert!(limiter.try_acquire("y.example.com"));
    }

    #[tokio::test]
    async fn janitor_clears_map_past_cap() {
        let limiter = DomainRateLimiter::new(10.0, 10);
        for i in 0..5 {
            limiter.try_acquire(&format!("h{i}.example.com"));
        }
        // lower the cap via a fresh instance to exercise the eviction path deterministically
        let small = DomainRateLimiter {
            buckets: limiter.buckets.clone(),
            rate: limiter.rate,
            burst: limiter.burst,
            max_tracked_domains: 3,
        };
        small.janitor_tick();
        assert_eq!(small.tracked_domains(), 0);
    }
}
