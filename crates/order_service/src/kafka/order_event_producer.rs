use async_trait::async_trait;
use coldchain_domain::{DomainError, DomainResult, OrderEvent, OrderEventPublisher};
use coldchain_fabric::kafka::{future_producer, Acks};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::debug;

/// Mirrors every order event onto the log broker, keyed by order id so
/// the warehouse consumer observes per-order mutations in order.
pub struct KafkaOrderEventProducer {
    producer: FutureProducer,
    topic: String,
}

impl KafkaOrderEventProducer {
    pub fn new(brokers: &str, topic: String) -> anyhow::Result<Self> {
        let producer = future_producer(brokers, Acks::One)?;
        Ok(Self { producer, topic })
    }

    /// Flush buffered records on shutdown, bounded by a short grace
    /// period.
    pub async fn flush(&self) -> anyhow::Result<()> {
        use rdkafka::producer::Producer;

        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || {
            producer.flush(Timeout::After(Duration::from_secs(2)))
        })
        .await
        .map_err(|err| anyhow::anyhow!("flush task failed: {err}"))?
        .map_err(|err| anyhow::anyhow!("failed to flush order events: {err}"))
    }
}

#[async_trait]
impl OrderEventPublisher for KafkaOrderEventProducer {
    async fn publish_order_event(&self, event: &OrderEvent) -> DomainResult<()> {
        let payload = serde_json::to_vec(event)?;

        let record = FutureRecord::to(&self.topic)
            .payload(&payload)
            .key(event.order_id.as_bytes());

        self.producer
            .send(record, Timeout::After(Duration::from_secs(10)))
            .await
            .map_err(|(err, _)| {
                DomainError::RepositoryError(anyhow::anyhow!(
                    "Failed to publish order event to {}: {err}",
                    self.topic
                ))
            })?;

        debug!(
            topic = %self.topic,
            event_type = %event.event_type,
            order_id = %event.order_id,
            "published order event to log broker"
        );
        Ok(())
    }
}
