use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("timed out acquiring a page from the pool")]
    AcquireTimeout,
    #[error("pool is shut down")]
    Closed,
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },
    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },
    #[error("content extraction failed for {url}: {reason}")]
    ExtractionFailed { url: String, reason: String },
}
