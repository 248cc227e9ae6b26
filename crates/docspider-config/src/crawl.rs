//! Crawl configuration: the full set of tunables from the spec's
//! configuration surface, each with a default and, for the handful the
//! crawl directive is allowed to override, a field marked below.
//!
//! Grounded on the teacher's `riptide-config::spider::SpiderConfig` /
//! `PerformanceConfig` split (one struct for crawl-shape limits, one for
//! concurrency/timing), generalized to the fields this spec actually names
//! instead of the teacher's broader scraping surface (robots, redirects,
//! bloom-filter dedup — none of which this crawler uses).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one crawl. Defaults match the spec's configuration
/// surface; `max_pages`, `max_depth`, `max_concurrency`, and
/// `max_crawl_duration` are the only fields a `CrawlDirective` may
/// override (see [`CrawlConfig::apply_directive_overrides`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlConfig {
    pub max_pages: usize,
    pub max_depth: u32,
    pub max_concurrency: usize,
    #[serde(with = "duration_secs")]
    pub max_crawl_duration: Duration,

    #[serde(with = "duration_secs")]
    pub page_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub network_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub idle_timeout: Duration,

    pub requests_per_second: f64,
    #[serde(with = "duration_millis")]
    pub request_delay: Duration,

    pub compress_html: bool,
    pub max_html_size: usize,
    pub extract_text: bool,
    pub max_text_length: usize,

    pub bus_topic: String,
    pub bus_batch_size: usize,
    #[serde(with = "duration_secs")]
    pub bus_flush_time: Duration,

    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            max_depth: 5,
            max_concurrency: 5,
            max_crawl_duration: Duration::from_secs(600),

            page_timeout: Duration::from_secs(30),
            network_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(2),

            requests_per_second: 2.0,
            request_delay: Duration::from_millis(500),

            compress_html: true,
            max_html_size: 5 * 1024 * 1024,
            extract_text: true,
            max_text_length: 1024 * 1024,

            bus_topic: "indexing_jobs".to_string(),
            bus_batch_size: 50,
            bus_flush_time: Duration::from_secs(5),

            user_agent: "docspider/1.0 (+https://example.invalid/bot)".to_string(),
        }
    }
}

impl CrawlConfig {
    /// Apply the subset of fields a `CrawlDirective` is allowed to
    /// override. Directive fields are already clamped by their own serde
    /// defaults in `docspider-types`; this only copies them across.
    pub fn apply_directive_overrides(
        mut self,
        max_pages: usize,
        max_depth: u32,
        max_crawl_duration: Duration,
    ) -> Self {
        self.max_pages = max_pages;
        self.max_depth = max_depth;
        self.max_crawl_duration = max_crawl_duration;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
