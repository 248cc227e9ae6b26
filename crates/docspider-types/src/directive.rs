use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable configuration for one crawl, received from an external caller
/// (e.g. a message on an incoming topic). Additional fields on the wire are
/// ignored by `serde`'s default (non-`deny_unknown_fields`) behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlDirective {
    pub request_id: u32,
    pub project_id: u32,
    pub user_id: String,
    /// Opaque workspace key stamped on every emitted message.
    pub collection_id: String,
    pub base_url: String,
    #[serde(default = "CrawlDirective::default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "CrawlDirective::default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "CrawlDirective::default_max_duration", with = "duration_secs")]
    pub max_crawl_duration: Duration,
}

impl CrawlDirective {
    pub fn default_max_pages() -> u32 {
        20
    }

    pub fn default_max_depth() -> u32 {
        5
    }

    pub fn default_max_duration() -> Duration {
        Duration::from_secs(600)
    }

    pub fn crawl_session_id(&self) -> String {
        format!("crawl_{}", self.request_id)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let json = serde_json::json!({
            "request_id": 1,
            "project_id": 2,
            "user_id": "u1",
            "collection_id": "11111111-1111-1111-1111-111111111111",
            "base_url": "https://docs.example.com",
        });
        let directive: CrawlDirective = serde_json::from_value(json).unwrap();
        assert_eq!(directive.max_pages, 20);
        assert_eq!(directive.max_depth, 5);
        assert_eq!(directive.max_crawl_duration, Duration::from_secs(600));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = serde_json::json!({
            "request_id": 1,
            "project_id": 2,
            "user_id": "u1",
            "collection_id": "c1",
            "base_url": "https://docs.example.com",
            "max_pages": 5,
            "max_depth": 2,
            "something_else": "ignored",
        });
        let directive: CrawlDirective = serde_json::from_value(json).unwrap();
        assert_eq!(directive.max_pages, 5);
        assert_eq!(directive.crawl_session_id(), "crawl_1");
    }
}
