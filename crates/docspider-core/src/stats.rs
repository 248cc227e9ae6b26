//! Running counters sampled into a [`CrawlStats`] snapshot.
//!
//! Split from `docspider_spider::FrontierStats` because `found`/`filtered`
//! live on the frontier (it's the thing enforcing those invariants) while
//! `crawled`/`failed`/`jobs_sent`/response-time are owned by the pipeline,
//! which is the only place that sees every [`CrawlResult`] pass through.

use docspider_types::stats::CrawlStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct StatsTracker {
    crawled: AtomicU64,
    failed: AtomicU64,
    jobs_sent: AtomicU64,
    total_response_ms: AtomicU64,
    response_samples: AtomicU64,
    started_at: Instant,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            crawled: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            jobs_sent: AtomicU64::new(0),
            total_response_ms: AtomicU64::new(0),
            response_samples: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_success(&self, response_time_ms: u64) {
        self.crawled.fetch_add(1, Ordering::Relaxed);
        self.total_response_ms.fetch_add(response_time_ms, Ordering::Relaxed);
        self.response_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_sent(&self) {
        self.jobs_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn jobs_sent(&self) -> u64 {
        self.jobs_sent.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, found: u64, filtered: u64) -> CrawlStats {
        let samples = self.response_samples.load(Ordering::Relaxed);
        let total = self.total_response_ms.load(Ordering::Relaxed);
        CrawlStats {
            found,
            filtered,
            crawled: self.crawled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            duration: self.started_at.elapsed(),
            avg_response_time_ms: if samples > 0 {
                total as f64 / samples as f64
            } else {
                0.0
            },
            jobs_sent: self.jobs_sent(),
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_average_response_time() {
        let tracker = StatsTracker::new();
        tracker.record_success(100);
        tracker.record_success(200);
        tracker.record_failure();
        tracker.record_job_sent();

        let snap = tracker.snapshot(10, 2);
        assert_eq!(snap.found, 10);
        assert_eq!(snap.filtered, 2);
        assert_eq!(snap.crawled, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.jobs_sent, 1);
        assert_eq!(snap.avg_response_time_ms, 150.0);
    }

    #[test]
    fn snapshot_with_no_samples_has_zero_average() {
        let tracker = StatsTracker::new();
        let snap = tracker.snapshot(0, 0);
        assert_eq!(snap.avg_response_time_ms, 0.0);
    }
}
