use async_trait::async_trait;
use coldchain_domain::{DamageEvent, DamageEventSink, DomainError, DomainResult};
use coldchain_fabric::kafka::{future_producer, Acks};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::debug;

/// Mirrors damage events onto the log-broker damage topic, keyed by
/// order id. This sink and the MQTT sink are independent; neither knows
/// whether the other succeeded.
pub struct KafkaDamageProducer {
    producer: FutureProducer,
    topic: String,
}

impl KafkaDamageProducer {
    pub fn new(brokers: &str, topic: String) -> anyhow::Result<Self> {
        let producer = future_producer(brokers, Acks::All)?;
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
        .map_err(|err| anyhow::anyhow!("failed to flush damage events: {err}"))
    }
}

#[async_trait]
impl DamageEventSink for KafkaDamageProducer {
    async fn publish_damage_event(&self, event: &DamageEvent) -> DomainResult<()> {
        let payload = serde_json::to_vec(event)?;

        let record = FutureRecord::to(&self.topic)
            .payload(&payload)
            .key(event.order_id.as_bytes());

        self.producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
            .map_err(|(err, _)| {
                DomainError::RepositoryError(anyhow::anyhow!(
                    "Failed to publish damage event to {}: {err}",
                    self.topic
                ))
            })?;

        debug!(
            topic = %self.topic,
            order_id = %event.order_id,
            "published damage event to log broker"
        );
        Ok(())
    }
}
