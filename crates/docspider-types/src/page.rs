use crate::frontier_item::SourceTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transient record produced by the browser pool's `fetch`.
#[derive(Debug, Clone)]
pub struct PageFetchResult {
    pub url: String,
    pub markup: String,
    /// Body text, already truncated to `max_text_length`.
    pub text: String,
    pub title: String,
    /// Absolute links discovered on the page, before filtering.
    pub links: Vec<DiscoveredLink>,
    pub status: u16,
    pub response_time_ms: u64,
}

/// A link discovered on a page, paired with the DOM region it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: String,
    pub source: SourceTag,
}

/// The worker's emission, consumed by the result pipeline.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: String,
    pub depth: u32,
    pub parent_url: String,
    pub success: bool,
    /// Empty on success.
    pub error: String,
    pub processed_at: DateTime<Utc>,
    pub markup: String,
    pub text: String,
    pub title: String,
    pub status: u16,
    pub response_time_ms: u64,
    /// Links that passed the URL filter, paired with their source tag.
    pub discovered_links: Vec<DiscoveredLink>,
}

impl CrawlResult {
    pub fn failure(url: String, depth: u32, parent_url: String, error: String) -> Self {
        Self {
            url,
            depth,
            parent_url,
            success: false,
            error,
            processed_at: Utc::now(),
            markup: String::new(),
            text: String::new(),
            title: String::new(),
            status: 0,
            response_time_ms: 0,
            discovered_links: Vec::new(),
        }
    }
}

/// Content payload embedded in a [`BusMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    /// gzip+base64, may be empty.
    pub html: String,
    pub text: String,
    pub title: String,
    pub content_type: String,
    pub encoding: String,
    /// Uncompressed byte length.
    pub html_size: usize,
}

/// External contract emitted per successfully fetched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub job_id: u32,
    pub request_id: u32,
    pub project_id: u32,
    pub user_id: String,
    pub collection_id: String,
    /// Normalized URL.
    pub url: String,
    pub depth: u32,
    /// Empty string for the seed page.
    pub parent_url: String,
    pub content: MessageContent,
    pub discovered_at: DateTime<Utc>,
    pub metadata: MessageMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub base_url: String,
    pub crawl_session_id: String,
}

impl BusMessage {
    /// The partition key the bus producer keys on: the page's host.
    pub fn partition_key(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}
