//! Browser pool for rendered-page fetching in the docspider crawler core.
//!
//! Grounded on the teacher's `riptide-headless` crate boundary: one crate
//! owning everything that talks to the headless browser process, kept
//! behind a narrow `pool`/`error` surface so `docspider-core` never touches
//! `spider_chrome` types directly.

pub mod error;
pub mod pool;

pub use error::PoolError;
pub use pool::{BrowserPool, BrowserPoolConfig, PooledPage};
