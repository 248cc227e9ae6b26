//! Default [`BusProducer`] adapter: in-process, per-key ordered.
//!
//! Grounded on the teacher's `riptide-types` events port, whose doc
//! comment exists "to support swapping message brokers (RabbitMQ, Kafka,
//! NATS, etc.)" without touching callers. This adapter proves the same
//! per-key ordering invariant a real broker-backed one must honor: one
//! `mpsc::unbounded_channel` per partition key, drained in order by a
//! single spawned task per key, so two messages with the same key are
//! always observed in submission order. A production deployment swaps
//! this for a broker client (e.g. `rdkafka`) against the same trait.

use async_trait::async_trait;
use dashmap::DashMap;
use docspider_types::page::BusMessage;
use docspider_types::ports::bus::{BusProducer, PublishError};
use tokio::sync::mpsc;
use tracing::info;

/// Publishes by logging each message at `info` level, one lane per
/// partition key. Not a substitute for a real broker; a harness for
/// exercising the pipeline and proving ordering without one.
pub struct InProcessBus {
    lanes: DashMap<String, mpsc::UnboundedSender<BusMessage>>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self { lanes: DashMap::new() }
    }

    fn lane_for(&self, key: &str, topic: String) -> mpsc::UnboundedSender<BusMessage> {
        // `entry` holds the shard lock across the check-then-insert so two
        // concurrent first-publishes for the same key can't each spawn
        // their own lane and silently drop one of them.
        self.lanes
            .entry(key.to_string())
            .or_insert_with(|| {
                let (tx, mut rx) = mpsc::unbounded_channel::<BusMessage>();
                tokio::spawn(async move {
                    while let Some(message) = rx.recv().await {
                        match serde_json::to_string(&message) {
                            Ok(json) => {
                                info!(%topic, key = %message.partition_key(), payload = %json, "bus message")
                            }
                            Err(e) => tracing::warn!(error = %e, "failed to serialize bus message"),
                        }
                    }
                });
                tx
            })
            .clone()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusProducer for InProcessBus {
    async fn publish(&self, topic: &str, message: BusMessage) -> Result<(), PublishError> {
        let key = message.partition_key();
        let tx = self.lane_for(&key, topic.to_string());
        tx.send(message).map_err(|e| PublishError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docspider_types::page::{MessageContent, MessageMetadata};

    fn message(job_id: u32, url: &str) -> BusMessage {
        BusMessage {
            job_id,
            request_id: 1,
            project_id: 1,
            user_id: "u1".to_string(),
            collection_id: "c1".to_string(),
            url: url.to_string(),
            depth: 0,
            parent_url: String::new(),
            content: MessageContent {
                html: String::new(),
                text: String::new(),
                title: String::new(),
                content_type: "text/html".to_string(),
                encoding: "plain".to_string(),
                html_size: 0,
            },
            discovered_at: Utc::now(),
            metadata: MessageMetadata {
                base_url: url.to_string(),
                crawl_session_id: "crawl_1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn publish_succeeds_for_same_and_different_keys() {
        let bus = InProcessBus::new();
        bus.publish("indexing_jobs", message(1, "https://docs.example.com/a"))
            .await
            .unwrap();
        bus.publish("indexing_jobs", message(2, "https://docs.example.com/b"))
            .await
            .unwrap();
        bus.publish("indexing_jobs", message(3, "https://other.example.com/c"))
            .await
            .unwrap();
    }
}
