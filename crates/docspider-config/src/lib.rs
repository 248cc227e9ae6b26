//! Configuration surface for the docspider crawler core.
//!
//! - [`crawl::CrawlConfig`]: every tunable named in the spec's
//!   configuration surface, with matching defaults.
//! - [`env`]: `DOCSPIDER_`-prefixed environment variable overrides.

pub mod crawl;
pub mod env;

pub use crawl::CrawlConfig;
pub use env::{apply_env_overrides, EnvConfigLoader, EnvError};
