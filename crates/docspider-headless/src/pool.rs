//! Browser pool: one browser process, a bounded channel of pre-created
//! pages, each in its own incognito browsing context.
//!
//! Grounded on the teacher's `riptide-headless::pool::PooledBrowser`
//! (unique per-instance `TempDir` profile, `BrowserConfig::builder()` with
//! the same stability/perf launch args, a spawned handler task draining
//! the CDP event stream) generalized from "pool of N browser processes"
//! to "one browser process, N pooled pages" — cheaper for this spec's
//! `max_concurrency` (single digits). A `Page` being its own CDP target
//! is not, by itself, the isolated browsing context §4.4 requires: pages
//! created against the browser's shared default context share cookies
//! and storage with one another. Every pooled page is instead created in
//! a freshly spawned incognito context via `start_incognito_context`, so
//! no two concurrently live pages ever see each other's cookie jar. The
//! teacher's `--disable-images`/`--disable-javascript` launch args are
//! dropped: §4.4 fetch requires JS-rendered markup.

use docspider_types::frontier_item::SourceTag;
use docspider_types::page::{DiscoveredLink, PageFetchResult};
use futures::StreamExt;
use chromiumoxide::{Browser, BrowserConfig, Page};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::PoolError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    pub max_concurrency: usize,
    pub network_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_text_length: usize,
    pub user_agent: String,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            network_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(2),
            max_text_length: 1024 * 1024,
            user_agent: "docspider/1.0 (+https://example.invalid/bot)".to_string(),
        }
    }
}

/// A page drawn from the pool. Dropping without calling
/// [`BrowserPool::release`] leaks the slot for the lifetime of the pool;
/// callers must always release.
pub struct PooledPage {
    pub page: Page,
}

pub struct BrowserPool {
    browser: tokio::sync::Mutex<Browser>,
    handler_task: JoinHandle<()>,
    free_tx: mpsc::Sender<PooledPage>,
    free_rx: tokio::sync::Mutex<mpsc::Receiver<PooledPage>>,
    config: BrowserPoolConfig,
    _profile_dir: TempDir,
}

impl BrowserPool {
    pub async fn launch(config: BrowserPoolConfig) -> Result<Self, PoolError> {
        let profile_dir =
            TempDir::new().map_err(|e| PoolError::Launch(format!("temp profile dir: {e}")))?;

        let mut browser_config = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-web-security")
            .arg("--disable-extensions")
            .arg("--disable-plugins")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-backgrounding-occluded-windows")
            .arg("--disable-renderer-backgrounding")
            .arg("--memory-pressure-off")
            .arg(format!("--user-agent={}", config.user_agent))
            .build()
            .map_err(|e| PoolError::Launch(format!("browser config: {e}")))?;
        browser_config.user_data_dir = Some(profile_dir.path().to_path_buf());

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| PoolError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "browser event error");
                }
            }
        });

        let (free_tx, free_rx) = mpsc::channel(config.max_concurrency);

        let pool = Self {
            browser: tokio::sync::Mutex::new(browser),
            handler_task,
            free_tx,
            free_rx: tokio::sync::Mutex::new(free_rx),
            config,
            _profile_dir: profile_dir,
        };

        for i in 0..pool.config.max_concurrency {
            let pooled = pool
                .spawn_incognito_page()
                .await
                .map_err(|e| PoolError::Launch(format!("initial page {i}: {e}")))?;
            pool.free_tx
                .send(pooled)
                .await
                .map_err(|_| PoolError::Closed)?;
        }

        Ok(pool)
    }

    pub fn config(&self) -> &BrowserPoolConfig {
        &self.config
    }

    /// Spawns a fresh incognito browsing context and opens a page in it,
    /// so the returned page shares no cookies or storage with any other
    /// page the pool hands out.
    async fn spawn_incognito_page(&self) -> Result<PooledPage, PoolError> {
        let mut browser = self.browser.lock().await;
        browser
            .start_incognito_context()
            .await
            .map_err(|e| PoolError::Launch(format!("incognito context: {e}")))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| PoolError::Launch(format!("page in incognito context: {e}")))?;
        Ok(PooledPage { page })
    }

    /// Blocks up to 30s for a free page.
    pub async fn acquire(&self) -> Result<PooledPage, PoolError> {
        let mut rx = self.free_rx.lock().await;
        match timeout(ACQUIRE_TIMEOUT, rx.recv()).await {
            Ok(Some(pooled)) => Ok(pooled),
            Ok(None) => Err(PoolError::Closed),
            Err(_) => Err(PoolError::AcquireTimeout),
        }
    }

    /// Closes the used page's target and its incognito context outright
    /// rather than merely navigating it to `about:blank` — a shared
    /// context surviving a `goto` would still carry the old page's
    /// cookies and storage — then replaces it with a freshly spawned
    /// incognito page before returning it to the pool. If the pool has
    /// already been shut down, the new page is dropped instead.
    pub async fn release(&self, pooled: PooledPage) {
        if let Err(e) = pooled.page.close().await {
            warn!(error = %e, "failed to close released page");
        }
        match self.spawn_incognito_page().await {
            Ok(fresh) => {
                if self.free_tx.send(fresh).await.is_err() {
                    debug!("pool closed during release, page dropped");
                }
            }
            Err(e) => warn!(error = %e, "failed to spawn replacement page on release"),
        }
    }

    /// Drains the pool, closes each page, closes the browser.
    pub async fn shutdown(self) {
        drop(self.free_tx);
        let mut rx = self.free_rx.into_inner();
        rx.close();
        while let Some(pooled) = rx.recv().await {
            if let Err(e) = pooled.page.close().await {
                warn!(error = %e, "failed to close pooled page");
            }
        }
        let mut browser = self.browser.into_inner();
        if let Err(e) = browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        self.handler_task.abort();
    }

    /// Fetches `url` on `pooled`'s page per §4.4's fetch algorithm.
    pub async fn fetch(&self, pooled: &PooledPage, url: &str) -> Result<PageFetchResult, PoolError> {
        let start = Instant::now();
        let page = &pooled.page;

        let nav_result = timeout(self.config.network_timeout, page.goto(url)).await;
        match nav_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(PoolError::NavigationFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(PoolError::NavigationTimeout {
                    url: url.to_string(),
                })
            }
        };

        tokio::time::sleep(self.config.idle_timeout).await;

        let status = navigation_status(page).await;

        let markup = page.content().await.map_err(|e| PoolError::ExtractionFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let text = extract_text(page, self.config.max_text_length).await?;
        let title = extract_title(page).await.unwrap_or_default();
        let links = extract_links(page).await.unwrap_or_default();

        Ok(PageFetchResult {
            url: url.to_string(),
            markup,
            text,
            title,
            links,
            status,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Best-effort HTTP status of the main document, read off the Navigation
/// Timing L2 API (`PerformanceNavigationTiming.responseStatus`). spider_chrome's
/// `goto` does not surface the navigation response directly, so this is the
/// same indirection the browser's own Resource Timing panel uses. Returns
/// 0 if unavailable (older Chromium, cross-origin timing restrictions).
async fn navigation_status(page: &Page) -> u16 {
    const SCRIPT: &str = r#"
        (() => {
            const entries = performance.getEntriesByType('navigation');
            return entries.length > 0 ? (entries[0].responseStatus || 0) : 0;
        })();
    "#;
    page.evaluate(SCRIPT)
        .await
        .ok()
        .and_then(|v| v.into_value::<u16>().ok())
        .unwrap_or(0)
}

async fn extract_text(page: &Page, max_text_length: usize) -> Result<String, PoolError> {
    let raw = page
        .evaluate("document.body ? document.body.innerText : ''")
        .await
        .map_err(|e| PoolError::ExtractionFailed {
            url: String::new(),
            reason: e.to_string(),
        })?
        .into_value::<String>()
        .unwrap_or_default();
    Ok(truncate_chars(&raw, max_text_length))
}

async fn extract_title(page: &Page) -> Option<String> {
    page.evaluate("document.title").await.ok()?.into_value::<String>().ok()
}

/// Returns every anchor's absolute `href` starting with `http`, paired
/// with a source tag derived from ancestor inspection: inside `nav` or an
/// element carrying `sidebar` in its class/id → `sidebar`, inside
/// `footer` → `footer`, otherwise `content`.
async fn extract_links(page: &Page) -> Option<Vec<DiscoveredLink>> {
    const SCRIPT: &str = r#"
        Array.from(document.querySelectorAll('a[href]'))
            .map(a => {
                const href = a.href;
                let node = a;
                let source = 'content';
                while (node) {
                    const tag = (node.tagName || '').toLowerCase();
                    const cls = (node.className || '').toString().toLowerCase();
                    const id = (node.id || '').toLowerCase();
                    if (tag === 'nav' || cls.includes('sidebar') || id.includes('sidebar')) {
                        source = 'sidebar';
                        break;
                    }
                    if (tag === 'footer') {
                        source = 'footer';
                        break;
                    }
                    node = node.parentElement;
                }
                return { href, source };
            })
            .filter(l => l.href.startsWith('http'));
    "#;

    #[derive(serde::Deserialize)]
    struct RawLink {
        href: String,
        source: String,
    }

    let raw: Vec<RawLink> = page.evaluate(SCRIPT).await.ok()?.into_value().ok()?;
    Some(
        raw.into_iter()
            .map(|l| DiscoveredLink {
                url: l.href,
                source: match l.source.as_str() {
                    "sidebar" => SourceTag::Sidebar,
                    "footer" => SourceTag::Footer,
                    _ => SourceTag::Content,
                },
            })
            .collect(),
    )
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect()
    }
}
