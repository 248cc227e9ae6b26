//! The crawl coordinator: wires the filter, frontier, rate limiter,
//! browser pool, workers, result pipeline, and completion monitor for one
//! [`CrawlDirective`], then exposes start/stop/wait/stats per §4.8.
//!
//! Grounded on the teacher's `riptide-workers::WorkerService` — a single
//! owning struct built by an async constructor that can itself fail
//! (`WorkerService::new`), spawning its sub-tasks and holding their
//! `JoinHandle`s for an explicit `stop()`. Unlike the teacher's
//! `AtomicBool` running flag, idempotency here is structural: every
//! handle consumed during teardown lives in an `Option`, so a second
//! `stop()`/`wait()` call finds nothing left to drain and returns the
//! cached result instead of double-closing anything.

use docspider_config::crawl::CrawlConfig;
use docspider_headless::pool::{BrowserPool, BrowserPoolConfig};
use docspider_spider::filter::UrlFilter;
use docspider_spider::frontier::UrlFrontier;
use docspider_types::frontier_item::UrlItem;
use docspider_types::ports::bus::BusProducer;
use docspider_types::ports::rate_limiter::PerHostRateLimiter;
use docspider_types::stats::{CrawlStats, StopReason};
use docspider_types::{CrawlDirective, CrawlError};
use docspider_utils::rate_limit::{spawn_janitor, DomainRateLimiter};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::monitor::CompletionMonitor;
use crate::pipeline::ResultPipeline;
use crate::stats::StatsTracker;
use crate::worker::Worker;

/// Upper bound on how long `Coordinator::stop`/`wait` waits for workers to
/// drain before proceeding with teardown anyway (§4.8).
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Coordinator {
    frontier: Arc<UrlFrontier>,
    stats: Arc<StatsTracker>,
    cancel: CancellationToken,
    worker_handles: Vec<JoinHandle<()>>,
    pool: Option<Arc<BrowserPool>>,
    rate_limiter: Option<Arc<DomainRateLimiter>>,
    pipeline_handle: Option<JoinHandle<()>>,
    monitor_handle: Option<JoinHandle<StopReason>>,
    janitor_handle: Option<JoinHandle<()>>,
    final_result: Option<(StopReason, CrawlStats)>,
}

impl Coordinator {
    /// Builds the filter from the base URL, constructs the frontier, rate
    /// limiter, and browser pool, pushes the seed item at depth 0, starts
    /// the pipeline task, spawns `max_concurrency` workers, and starts the
    /// monitor. Fatal errors (browser launch, filter construction) are
    /// returned synchronously instead of surfacing through a worker.
    pub async fn start(
        directive: CrawlDirective,
        config: CrawlConfig,
        bus: Arc<dyn BusProducer>,
    ) -> Result<Self, CrawlError> {
        let base_url = Url::parse(&directive.base_url)
            .map_err(|e| CrawlError::Fatal(format!("invalid base url: {e}")))?;
        let filter =
            Arc::new(UrlFilter::new(&base_url).map_err(|e| CrawlError::Fatal(e.to_string()))?);

        let frontier = Arc::new(UrlFrontier::new(directive.max_depth, directive.max_pages as usize));

        let burst = config.requests_per_second.ceil().max(1.0) as u32;
        let rate_limiter = Arc::new(DomainRateLimiter::new(config.requests_per_second, burst));
        let janitor_handle = spawn_janitor(rate_limiter.clone());

        let pool_config = BrowserPoolConfig {
            max_concurrency: config.max_concurrency,
            network_timeout: config.network_timeout,
            idle_timeout: config.idle_timeout,
            max_text_length: config.max_text_length,
            user_agent: config.user_agent.clone(),
        };
        let pool = Arc::new(
            BrowserPool::launch(pool_config)
                .await
                .map_err(|e| CrawlError::Fatal(e.to_string()))?,
        );

        let stats = Arc::new(StatsTracker::new());
        let cancel = CancellationToken::new();

        // The seed is exempt from relevance filtering (enforced by `push`
        // itself, which only relevance-checks depth > 0) but still passes
        // through normalization.
        let seed = UrlItem::seed(directive.base_url.clone());
        if !frontier.push(seed, &filter) {
            return Err(CrawlError::Fatal(format!(
                "seed url rejected by frontier: {}",
                directive.base_url
            )));
        }

        let (results_tx, results_rx) = mpsc::channel(2 * config.max_concurrency);

        let mut worker_handles = Vec::with_capacity(config.max_concurrency);
        for id in 0..config.max_concurrency {
            let worker = Worker::new(
                id,
                frontier.clone(),
                filter.clone(),
                rate_limiter.clone() as Arc<dyn PerHostRateLimiter>,
                pool.clone(),
                results_tx.clone(),
                cancel.clone(),
                config.page_timeout,
                config.max_html_size,
            );
            worker_handles.push(tokio::spawn(worker.run()));
        }
        // Drop the coordinator's own sender so the channel closes once
        // every worker's clone has been dropped, letting the pipeline's
        // `recv()` loop end naturally.
        drop(results_tx);

        let pipeline = ResultPipeline::new(
            frontier.clone(),
            filter.clone(),
            bus,
            directive.clone(),
            config.bus_topic.clone(),
            config.compress_html,
            stats.clone(),
        );
        let pipeline_handle = tokio::spawn(pipeline.run(results_rx));

        let monitor = CompletionMonitor::new(
            frontier.clone(),
            stats.clone(),
            cancel.clone(),
            directive.max_crawl_duration,
            directive.max_pages as usize,
        );
        let monitor_handle = tokio::spawn(monitor.run());

        info!(
            base_url = %directive.base_url,
            max_pages = directive.max_pages,
            max_depth = directive.max_depth,
            max_concurrency = config.max_concurrency,
            "coordinator: crawl started"
        );

        Ok(Self {
            frontier,
            stats,
            cancel,
            worker_handles,
            pool: Some(pool),
            rate_limiter: Some(rate_limiter),
            pipeline_handle: Some(pipeline_handle),
            monitor_handle: Some(monitor_handle),
            janitor_handle: Some(janitor_handle),
            final_result: None,
        })
    }

    /// A clone of the coordinator's cancellation token. Lets an owning
    /// process (e.g. a Ctrl+C handler) request a stop without needing a
    /// mutable reference to the coordinator itself, so it can keep driving
    /// [`Coordinator::wait`] concurrently.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// A point-in-time progress snapshot. Safe to call repeatedly while
    /// the crawl is running; consumed by the owning system for the
    /// `progress` status callback.
    pub fn stats(&self) -> CrawlStats {
        if let Some((_, stats)) = &self.final_result {
            return stats.clone();
        }
        let frontier_stats = self.frontier.stats();
        self.stats.snapshot(
            frontier_stats.added.load(Ordering::Relaxed) as u64,
            frontier_stats.filtered.load(Ordering::Relaxed) as u64,
        )
    }

    /// Blocks until the completion monitor decides the crawl is done
    /// (idle, stuck, or over its time budget), then tears everything down.
    /// Idempotent: a second call returns the cached result from the first.
    pub async fn wait(&mut self) -> (StopReason, CrawlStats) {
        if let Some(result) = &self.final_result {
            return result.clone();
        }
        let reason = match self.monitor_handle.take() {
            Some(handle) => handle.await.unwrap_or(StopReason::Cancelled),
            None => StopReason::Cancelled,
        };
        self.teardown(reason).await
    }

    /// Broadcasts cancellation to every worker, the pipeline, the monitor,
    /// and any in-flight rate-limiter wait or pool acquire, then tears
    /// everything down the same way `wait` does. Idempotent for the same
    /// reason as `wait`.
    pub async fn stop(&mut self) -> (StopReason, CrawlStats) {
        self.cancel.cancel();
        self.wait().await
    }

    async fn teardown(&mut self, reason: StopReason) -> (StopReason, CrawlStats) {
        self.cancel.cancel();

        let worker_handles = std::mem::take(&mut self.worker_handles);
        let drain = async {
            for handle in worker_handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("coordinator: workers did not drain within the teardown timeout");
        }

        if let Some(pool) = self.pool.take() {
            match Arc::try_unwrap(pool) {
                Ok(pool) => pool.shutdown().await,
                Err(_) => warn!("coordinator: browser pool still referenced at teardown, skipping close"),
            }
        }

        if let Some(handle) = self.janitor_handle.take() {
            handle.abort();
        }
        self.rate_limiter.take();

        // Close the results channel last: every worker has already exited
        // (dropping its sender clone), so the pipeline's `recv()` loop ends
        // on its own once it has drained whatever was already queued.
        if let Some(handle) = self.pipeline_handle.take() {
            let _ = handle.await;
        }

        let frontier_stats = self.frontier.stats();
        let stats = self.stats.snapshot(
            frontier_stats.added.load(Ordering::Relaxed) as u64,
            frontier_stats.filtered.load(Ordering::Relaxed) as u64,
        );
        info!(?reason, jobs_sent = stats.jobs_sent, "coordinator: crawl finished");
        self.final_result = Some((reason, stats.clone()));
        (reason, stats)
    }
}
