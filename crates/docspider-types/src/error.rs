//! Error taxonomy for the crawler core.
//!
//! One variant per kind from the error-handling design, not one variant per
//! call site — callers match on kind, not on which function produced it.

use thiserror::Error;

/// Result type alias using [`CrawlError`].
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Error kinds produced by the crawler core.
///
/// Per-URL failures (`FetchFailed`, `PoolExhausted`) are reported on the
/// worker's [`crate::CrawlResult`] rather than propagated; only
/// [`CrawlError::Fatal`] aborts `Coordinator::start`.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The browser process failed to launch, or the filter could not be
    /// constructed from the base URL. Aborts `start()`.
    #[error("fatal crawler error: {0}")]
    Fatal(String),

    /// Navigation timeout, 5xx, 429, or a DNS hiccup. Not retried by the
    /// core; the URL is marked complete, not visited.
    #[error("transient fetch failure for {url}: {reason}")]
    TransientFetch { url: String, reason: String },

    /// 4xx (except 429), non-HTML content-type, or markup over the size
    /// limit. Propagated the same way as a transient failure.
    #[error("permanent fetch failure for {url}: {reason}")]
    PermanentFetch { url: String, reason: String },

    /// No page became available from the browser pool within the
    /// configured acquire timeout.
    #[error("browser pool exhausted waiting for a page")]
    PoolExhausted,

    /// The crawl was cancelled; the worker returns without emitting a
    /// result.
    #[error("crawl cancelled")]
    Cancelled,

    /// The codec or bus producer failed. Logged; the crawl continues and
    /// the message for that URL is lost (at-most-once delivery).
    #[error("failed to publish message for {url}: {reason}")]
    PublishFailed { url: String, reason: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl CrawlError {
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        CrawlError::Custom(msg.into())
    }

    /// Whether a future retry layer could plausibly succeed on a retry.
    ///
    /// This crate never retries (see spec's open question on retry); the
    /// predicate exists so a caller building retry on top of this crate
    /// doesn't have to re-derive which kinds are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CrawlError::TransientFetch { .. } | CrawlError::PoolExhausted)
    }
}
