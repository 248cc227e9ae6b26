//! Completion monitor: ticks every 5s and decides when a crawl is
//! finished, stuck, or over its time budget, per §4.7.
//!
//! Grounded on the teacher's `riptide-pool::health_monitor` shape — a
//! periodic tick loop accumulating a running counter (there: consecutive
//! unhealthy checks; here: consecutive idle/stuck ticks) that only fires
//! past a threshold so a single noisy tick doesn't end the crawl.

use docspider_spider::frontier::UrlFrontier;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::stats::StatsTracker;
use docspider_types::stats::StopReason;

const TICK_INTERVAL: Duration = Duration::from_secs(5);
/// 3 consecutive idle ticks, i.e. >=15s of no pending work.
const IDLE_TICKS_TO_STOP: u32 = 3;
/// 6 consecutive stuck ticks, i.e. >=30s of no progress with only
/// in-flight URLs.
const STUCK_TICKS_TO_STOP: u32 = 6;

pub struct CompletionMonitor {
    frontier: Arc<UrlFrontier>,
    stats: Arc<StatsTracker>,
    cancel: CancellationToken,
    max_crawl_duration: Duration,
    max_pages: usize,
}

impl CompletionMonitor {
    pub fn new(
        frontier: Arc<UrlFrontier>,
        stats: Arc<StatsTracker>,
        cancel: CancellationToken,
        max_crawl_duration: Duration,
        max_pages: usize,
    ) -> Self {
        Self { frontier, stats, cancel, max_crawl_duration, max_pages }
    }

    /// Runs until a stop condition is met, cancellation is observed, or the
    /// process is torn down. Returns the reason the crawl ended.
    pub async fn run(self) -> StopReason {
        let started = Instant::now();
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        let mut idle_count = 0u32;
        let mut stuck_count = 0u32;
        let mut last_jobs_sent = self.stats.jobs_sent();

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.cancel.cancelled() => {
                    info!("completion monitor: cancelled");
                    return StopReason::Cancelled;
                }
            }

            if started.elapsed() >= self.max_crawl_duration {
                info!(elapsed_s = started.elapsed().as_secs(), "completion monitor: time budget exhausted");
                return StopReason::TimeBudget;
            }

            if !self.frontier.has_work() {
                idle_count += 1;
                debug!(idle_count, "completion monitor: frontier has no pending work");
                if idle_count >= IDLE_TICKS_TO_STOP {
                    info!("completion monitor: idle, crawl complete");
                    return if self.frontier.stats().added.load(Ordering::Relaxed) >= self.max_pages {
                        StopReason::MaxPagesBudget
                    } else {
                        StopReason::Idle
                    };
                }
                continue;
            }
            idle_count = 0;

            let heap_empty = self.frontier.heap_len() == 0;
            let in_flight = self.frontier.in_flight_count();
            let jobs_sent = self.stats.jobs_sent();

            if heap_empty && in_flight > 0 && jobs_sent == last_jobs_sent {
                stuck_count += 1;
                debug!(stuck_count, in_flight, "completion monitor: no progress with only in-flight urls");
                if stuck_count >= STUCK_TICKS_TO_STOP {
                    info!("completion monitor: stuck, forcing stop");
                    return StopReason::Stuck;
                }
            } else {
                stuck_count = 0;
            }
            last_jobs_sent = jobs_sent;
        }
    }
}
