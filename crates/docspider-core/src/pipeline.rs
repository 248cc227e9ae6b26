//! Result pipeline: the single consumer of the results channel. Expands
//! discovered links back into the frontier, encodes markup, and
//! publishes one bus message per successful page.
//!
//! A single consumer avoids contention between frontier expansion and
//! the bus producer that N workers writing directly would otherwise
//! create — the same reasoning behind the teacher's single
//! `JobScheduler` owning write access to its queue rather than letting
//! every worker touch it directly.

use docspider_spider::filter::UrlFilter;
use docspider_spider::frontier::UrlFrontier;
use docspider_types::codec;
use docspider_types::frontier_item::UrlItem;
use docspider_types::page::{BusMessage, CrawlResult, MessageContent, MessageMetadata};
use docspider_types::ports::bus::BusProducer;
use docspider_types::CrawlDirective;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::stats::StatsTracker;

pub struct ResultPipeline {
    frontier: Arc<UrlFrontier>,
    filter: Arc<UrlFilter>,
    bus: Arc<dyn BusProducer>,
    directive: CrawlDirective,
    bus_topic: String,
    compress_html: bool,
    stats: Arc<StatsTracker>,
    next_job_id: AtomicU32,
}

impl ResultPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frontier: Arc<UrlFrontier>,
        filter: Arc<UrlFilter>,
        bus: Arc<dyn BusProducer>,
        directive: CrawlDirective,
        bus_topic: String,
        compress_html: bool,
        stats: Arc<StatsTracker>,
    ) -> Self {
        Self {
            frontier,
            filter,
            bus,
            directive,
            bus_topic,
            compress_html,
            stats,
            next_job_id: AtomicU32::new(1),
        }
    }

    pub async fn run(self, mut results_rx: mpsc::Receiver<CrawlResult>) {
        while let Some(result) = results_rx.recv().await {
            if result.success {
                self.handle_success(result).await;
            } else {
                self.stats.record_failure();
            }
        }
        info!("result pipeline drained");
    }

    async fn handle_success(&self, result: CrawlResult) {
        self.stats.record_success(result.response_time_ms);

        for link in &result.discovered_links {
            let item = UrlItem {
                url: link.url.clone(),
                depth: result.depth + 1,
                parent_url: result.url.clone(),
                source: link.source,
            };
            // Rejections here (depth/cap/dedup/relevance) are silent by
            // design; the frontier's own `filtered` counter already
            // accounts for them.
            self.frontier.push(item, &self.filter);
        }

        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);

        let (html, encoding, html_size) = if result.markup.is_empty() {
            (String::new(), "plain".to_string(), 0usize)
        } else if self.compress_html {
            match codec::compress(result.markup.as_bytes()) {
                Ok(encoded) => (encoded, "gzip+base64".to_string(), result.markup.len()),
                Err(e) => {
                    error!(url = %result.url, error = %e, "failed to encode markup, dropping message");
                    return;
                }
            }
        } else {
            let size = result.markup.len();
            (result.markup.clone(), "plain".to_string(), size)
        };

        let message = BusMessage {
            job_id,
            request_id: self.directive.request_id,
            project_id: self.directive.project_id,
            user_id: self.directive.user_id.clone(),
            collection_id: self.directive.collection_id.clone(),
            url: result.url.clone(),
            depth: result.depth,
            parent_url: result.parent_url.clone(),
            content: MessageContent {
                html,
                text: result.text,
                title: result.title,
                content_type: "text/html".to_string(),
                encoding,
                html_size,
            },
            discovered_at: result.processed_at,
            metadata: MessageMetadata {
                base_url: self.directive.base_url.clone(),
                crawl_session_id: self.directive.crawl_session_id(),
            },
        };

        match self.bus.publish(&self.bus_topic, message).await {
            Ok(()) => self.stats.record_job_sent(),
            Err(e) => error!(url = %result.url, error = %e, "failed to publish bus message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docspider_types::frontier_item::SourceTag;
    use docspider_types::ports::bus::PublishError;
    use std::sync::Mutex;
    use url::Url;

    struct RecordingBus {
        published: Mutex<Vec<BusMessage>>,
    }

    impl RecordingBus {
        fn new() -> Self {
            Self { published: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl BusProducer for RecordingBus {
        async fn publish(&self, _topic: &str, message: BusMessage) -> Result<(), PublishError> {
            self.published.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn directive() -> CrawlDirective {
        CrawlDirective {
            request_id: 1,
            project_id: 2,
            user_id: "u1".to_string(),
            collection_id: "11111111-1111-1111-1111-111111111111".to_string(),
            base_url: "https://docs.example.com".to_string(),
            max_pages: 20,
            max_depth: 5,
            max_crawl_duration: std::time::Duration::from_secs(600),
        }
    }

    fn success_result(url: &str) -> CrawlResult {
        CrawlResult {
            url: url.to_string(),
            depth: 0,
            parent_url: String::new(),
            success: true,
            error: String::new(),
            processed_at: chrono::Utc::now(),
            markup: "<html>hi</html>".to_string(),
            text: "hi".to_string(),
            title: "Title".to_string(),
            status: 200,
            response_time_ms: 120,
            discovered_links: vec![docspider_types::page::DiscoveredLink {
                url: "https://docs.example.com/guide/setup".to_string(),
                source: SourceTag::Sidebar,
            }],
        }
    }

    fn pipeline(bus: Arc<dyn BusProducer>, compress_html: bool) -> ResultPipeline {
        let filter =
            Arc::new(UrlFilter::new(&Url::parse("https://docs.example.com/").unwrap()).unwrap());
        let frontier = Arc::new(UrlFrontier::new(5, 20));
        ResultPipeline::new(
            frontier,
            filter,
            bus,
            directive(),
            "indexing_jobs".to_string(),
            compress_html,
            Arc::new(StatsTracker::new()),
        )
    }

    #[tokio::test]
    async fn success_publishes_gzip_encoded_message_and_expands_frontier() {
        let bus = Arc::new(RecordingBus::new());
        let pipeline = pipeline(bus.clone(), true);
        let frontier = pipeline.frontier.clone();

        pipeline.handle_success(success_result("https://docs.example.com/guide")).await;

        let published = bus.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].content.encoding, "gzip+base64");
        assert_eq!(published[0].content.html_size, "<html>hi</html>".len());
        assert_eq!(published[0].job_id, 1);
        assert_eq!(published[0].metadata.crawl_session_id, "crawl_1");

        // the sidebar link discovered on the page was pushed at depth+1
        let popped = frontier.pop().unwrap();
        assert_eq!(popped.url, "https://docs.example.com/guide/setup");
        assert_eq!(popped.depth, 1);
    }

    #[tokio::test]
    async fn plain_encoding_when_compress_html_disabled() {
        let bus = Arc::new(RecordingBus::new());
        let pipeline = pipeline(bus.clone(), false);
        pipeline.handle_success(success_result("https://docs.example.com/guide")).await;

        let published = bus.published.lock().unwrap();
        assert_eq!(published[0].content.encoding, "plain");
        assert_eq!(published[0].content.html, "<html>hi</html>");
    }

    #[tokio::test]
    async fn empty_markup_skips_encoding() {
        let bus = Arc::new(RecordingBus::new());
        let pipeline = pipeline(bus.clone(), true);
        let mut result = success_result("https://docs.example.com/guide");
        result.markup = String::new();
        pipeline.handle_success(result).await;

        let published = bus.published.lock().unwrap();
        assert_eq!(published[0].content.encoding, "plain");
        assert_eq!(published[0].content.html, "");
        assert_eq!(published[0].content.html_size, 0);
    }

    #[tokio::test]
    async fn job_ids_are_monotonic_within_a_pipeline() {
        let bus = Arc::new(RecordingBus::new());
        let pipeline = pipeline(bus.clone(), true);
        pipeline.handle_success(success_result("https://docs.example.com/a")).await;
        pipeline.handle_success(success_result("https://docs.example.com/b")).await;

        let published = bus.published.lock().unwrap();
        assert_eq!(published[0].job_id, 1);
        assert_eq!(published[1].job_id, 2);
    }
}
