//! The worker state machine from the crawler core's loop: pop, wait on
//! the rate limiter, acquire a page, fetch, filter discovered links,
//! emit a result, release the page.
//!
//! Grounded on the teacher's `riptide-workers::worker::Worker` loop shape
//! (a `tokio::select!` between the work future and cancellation, rather
//! than polling an `AtomicBool`) generalized from "pop a job off a Redis
//! queue" to "pop a URL off the in-process frontier".

use docspider_headless::pool::BrowserPool;
use docspider_spider::UrlFrontier;
use docspider_types::frontier_item::UrlItem;
use docspider_types::page::{CrawlResult, DiscoveredLink};
use docspider_types::ports::rate_limiter::PerHostRateLimiter;
use docspider_types::CrawlError;
use docspider_spider::filter::UrlFilter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// How long a worker backs off after finding the frontier empty before
/// trying `pop()` again.
const POP_BACKOFF: Duration = Duration::from_millis(100);

pub struct Worker {
    id: usize,
    frontier: Arc<UrlFrontier>,
    filter: Arc<UrlFilter>,
    rate_limiter: Arc<dyn PerHostRateLimiter>,
    pool: Arc<BrowserPool>,
    results_tx: mpsc::Sender<CrawlResult>,
    cancel: CancellationToken,
    page_timeout: Duration,
    max_html_size: usize,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        frontier: Arc<UrlFrontier>,
        filter: Arc<UrlFilter>,
        rate_limiter: Arc<dyn PerHostRateLimiter>,
        pool: Arc<BrowserPool>,
        results_tx: mpsc::Sender<CrawlResult>,
        cancel: CancellationToken,
        page_timeout: Duration,
        max_html_size: usize,
    ) -> Self {
        Self {
            id,
            frontier,
            filter,
            rate_limiter,
            pool,
            results_tx,
            cancel,
            page_timeout,
            max_html_size,
        }
    }

    pub async fn run(self) {
        debug!(worker_id = self.id, "worker started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let Some(item) = self.frontier.pop() else {
                tokio::select! {
                    _ = tokio::time::sleep(POP_BACKOFF) => {}
                    _ = self.cancel.cancelled() => break,
                }
                continue;
            };
            self.process(item).await;
        }
        debug!(worker_id = self.id, "worker stopped");
    }

    async fn process(&self, item: UrlItem) {
        let domain = host_of(&item.url);

        let token_granted = tokio::select! {
            granted = self.rate_limiter.wait(&domain) => granted,
            _ = self.cancel.cancelled() => false,
        };
        if !token_granted {
            self.frontier.mark_complete(&item.url);
            return;
        }
        if self.cancel.is_cancelled() {
            self.frontier.mark_complete(&item.url);
            return;
        }

        let pooled = tokio::select! {
            acquired = self.pool.acquire() => acquired,
            _ = self.cancel.cancelled() => {
                self.frontier.mark_complete(&item.url);
                return;
            }
        };
        let pooled = match pooled {
            Ok(pooled) => pooled,
            Err(e) => {
                self.frontier.mark_complete(&item.url);
                self.emit_failure(&item, e.to_string()).await;
                return;
            }
        };

        let fetched = timeout(self.page_timeout, self.pool.fetch(&pooled, &item.url)).await;
        self.pool.release(pooled).await;

        match fetched {
            Ok(Ok(mut page)) => {
                if let Some(err) = classify_status(&item.url, page.status) {
                    self.frontier.mark_complete(&item.url);
                    self.emit_failure(&item, err.to_string()).await;
                    return;
                }
                self.frontier.mark_visited(&item.url);
                if page.markup.len() > self.max_html_size {
                    page.markup.truncate(self.max_html_size);
                }
                let discovered_links = self.filter_links(&item.url, page.links);
                let result = CrawlResult {
                    url: item.url.clone(),
                    depth: item.depth,
                    parent_url: item.parent_url.clone(),
                    success: true,
                    error: String::new(),
                    processed_at: chrono::Utc::now(),
                    markup: page.markup,
                    text: page.text,
                    title: page.title,
                    status: page.status,
                    response_time_ms: page.response_time_ms,
                    discovered_links,
                };
                self.send(result).await;
            }
            Ok(Err(e)) => {
                self.frontier.mark_complete(&item.url);
                self.emit_failure(&item, e.to_string()).await;
            }
            Err(_) => {
                self.frontier.mark_complete(&item.url);
                self.emit_failure(&item, format!("page fetch exceeded {:?}", self.page_timeout))
                    .await;
            }
        }
    }

    /// Resolves, normalizes, and relevance-filters the links a page
    /// surfaced, keeping the source tag the browser pool assigned each
    /// one. Relative hrefs shouldn't occur (the DOM's `.href` accessor
    /// already resolves them) but `resolve` is applied regardless so a
    /// non-conforming page doesn't slip an unresolved link past the
    /// filter.
    fn filter_links(&self, fetched_url: &str, links: Vec<DiscoveredLink>) -> Vec<DiscoveredLink> {
        filter_links(&self.filter, fetched_url, links)
    }

    async fn emit_failure(&self, item: &UrlItem, error: String) {
        warn!(url = %item.url, error = %error, "fetch failed");
        let result =
            CrawlResult::failure(item.url.clone(), item.depth, item.parent_url.clone(), error);
        self.send(result).await;
    }

    async fn send(&self, result: CrawlResult) {
        if self.results_tx.send(result).await.is_err() {
            debug!("results channel closed, dropping result");
        }
    }
}

/// Resolve, normalize, and relevance-filter one page's discovered links
/// against `fetched_url`'s base. Free function (rather than a method) so
/// it's testable without constructing a full [`Worker`], which needs a
/// live browser pool.
fn filter_links(
    filter: &UrlFilter,
    fetched_url: &str,
    links: Vec<DiscoveredLink>,
) -> Vec<DiscoveredLink> {
    let Ok(base) = Url::parse(fetched_url) else {
        return Vec::new();
    };
    links
        .into_iter()
        .filter_map(|link| {
            let resolved = filter.resolve(&base, &link.url).ok()?;
            let normalized = filter.normalize(resolved.as_str()).ok()?;
            filter
                .is_relevant(&normalized)
                .then(|| DiscoveredLink { url: normalized.to_string(), source: link.source })
        })
        .collect()
}

/// Classifies a fetched page's HTTP status per §7's fetch error taxonomy.
/// `0` (status unavailable) and the 2xx/3xx ranges are not failures. 429
/// and every 5xx are transient (worth retrying later); every other 4xx is
/// permanent (retrying won't help).
fn classify_status(url: &str, status: u16) -> Option<CrawlError> {
    match status {
        0..=399 => None,
        429 => Some(CrawlError::TransientFetch {
            url: url.to_string(),
            reason: format!("status {status}"),
        }),
        400..=499 => Some(CrawlError::PermanentFetch {
            url: url.to_string(),
            reason: format!("status {status}"),
        }),
        _ => Some(CrawlError::TransientFetch {
            url: url.to_string(),
            reason: format!("status {status}"),
        }),
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}
