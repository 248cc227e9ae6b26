//! Message bus producer port.
//!
//! This exists to support swapping message brokers (Kafka, Redpanda, NATS,
//! ...) without touching the result pipeline. The default adapter shipped
//! in `docspider-core` is in-process and per-key ordered; a production
//! deployment swaps in a broker-backed adapter against the same trait.

use crate::page::BusMessage;
use async_trait::async_trait;
use std::fmt;

#[derive(Debug)]
pub struct PublishError(pub String);

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus publish failed: {}", self.0)
    }
}

impl std::error::Error for PublishError {}

#[async_trait]
pub trait BusProducer: Send + Sync {
    /// Publish `message` keyed by `message.partition_key()`.
    ///
    /// Implementations must preserve per-key order: two messages with the
    /// same key must be observable by a consumer in submission order.
    async fn publish(&self, topic: &str, message: BusMessage) -> Result<(), PublishError>;
}
