use async_trait::async_trait;
use coldchain_domain::{BatchEvent, BatchEventPublisher, DomainError, DomainResult};
use coldchain_fabric::kafka::{future_producer, is_unknown_topic_or_partition, Acks};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const RECOVERY_WAIT: Duration = Duration::from_secs(2);
const FLUSH_GRACE: Duration = Duration::from_secs(2);

/// Writer lifecycle: `Ready -> (send fails with topic-missing) ->
/// Rebuilding -> Ready`. Any other failure leaves the writer in place
/// and surfaces to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Ready,
    Rebuilding,
}

struct Writer {
    producer: FutureProducer,
    state: WriterState,
}

/// Publishes batch events keyed by batch id, with typed headers, onto
/// the log broker.
///
/// Self-healing: a send rejected because the topic or partition does not
/// exist yet drops the writer, builds a fresh one with identical
/// configuration, waits for the topic to settle, and retries the same
/// record exactly once.
pub struct KafkaBatchEventPublisher {
    brokers: String,
    topic: String,
    writer: Mutex<Writer>,
}

impl KafkaBatchEventPublisher {
    pub fn new(brokers: &str, topic: String) -> anyhow::Result<Self> {
        let producer = future_producer(brokers, Acks::One)?;
        Ok(Self {
            brokers: brokers.to_string(),
            topic,
            writer: Mutex::new(Writer {
                producer,
                state: WriterState::Ready,
            }),
        })
    }

    fn headers_for(event: &BatchEvent) -> OwnedHeaders {
        let mut headers = OwnedHeaders::new()
            .insert(Header {
                key: "event_type",
                value: Some(event.event_type.as_bytes()),
            })
            .insert(Header {
                key: "batch_id",
                value: Some(event.batch_id.as_bytes()),
            })
            .insert(Header {
                key: "product_id",
                value: Some(event.product_id.as_bytes()),
            });

        if let Some(order_id) = &event.order_id {
            headers = headers.insert(Header {
                key: "order_id",
                value: Some(order_id.as_bytes()),
            });
        }

        headers.insert(Header {
            key: "timestamp",
            value: Some(event.timestamp.to_rfc3339().as_bytes()),
        })
    }

    /// Flush buffered records on shutdown, bounded by a short grace
    /// period.
    pub async fn flush(&self) -> anyhow::Result<()> {
        use rdkafka::producer::Producer;

        let producer = self.writer.lock().await.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(FLUSH_GRACE)))
            .await
            .map_err(|err| anyhow::anyhow!("flush task failed: {err}"))?
            .map_err(|err| anyhow::anyhow!("failed to flush batch events: {err}"))
    }

    async fn send(&self, producer: &FutureProducer, event: &BatchEvent, payload: &[u8]) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(&self.topic)
            .payload(payload)
            .key(event.batch_id.as_bytes())
            .headers(Self::headers_for(event));

        producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map(|_| ())
            .map_err(|(err, _)| err)
    }
}

#[async_trait]
impl BatchEventPublisher for KafkaBatchEventPublisher {
    async fn publish_batch_event(&self, event: &BatchEvent) -> DomainResult<()> {
        let payload = serde_json::to_vec(event)?;

        let producer = self.writer.lock().await.producer.clone();
        let first_attempt = self.send(&producer, event, &payload).await;

        let err = match first_attempt {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if !is_unknown_topic_or_partition(&err) {
            return Err(DomainError::RepositoryError(anyhow::anyhow!(
                "Failed to publish batch event to {}: {err}",
                self.topic
            )));
        }

        warn!(
            topic = %self.topic,
            batch_id = %event.batch_id,
            error = %err,
            "topic missing, rebuilding writer"
        );

        // Ready -> Rebuilding: drop the old writer and build a fresh one
        // with identical configuration.
        let producer = {
            let mut writer = self.writer.lock().await;
            writer.state = WriterState::Rebuilding;
            writer.producer = future_producer(&self.brokers, Acks::One).map_err(|rebuild_err| {
                DomainError::RepositoryError(anyhow::anyhow!(
                    "Failed to rebuild writer for {}: {rebuild_err}",
                    self.topic
                ))
            })?;
            writer.producer.clone()
        };

        tokio::time::sleep(RECOVERY_WAIT).await;

        let retried = self.send(&producer, event, &payload).await;

        // Rebuilding -> Ready regardless of the retry outcome: the new
        // writer is the writer from here on.
        self.writer.lock().await.state = WriterState::Ready;

        match retried {
            Ok(()) => {
                info!(
                    topic = %self.topic,
                    batch_id = %event.batch_id,
                    event_type = %event.event_type,
                    "published batch event after writer rebuild"
                );
                Ok(())
            }
            Err(retry_err) => Err(DomainError::RepositoryError(anyhow::anyhow!(
                "Failed to publish batch event to {} after writer rebuild: {retry_err}",
                self.topic
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldchain_domain::Batch;
    use rdkafka::message::Headers;

    fn sample_event() -> BatchEvent {
        let mut batch = Batch::new("BATCH-p1-20240101000000".to_string(), "p1".to_string());
        batch.add_item("order-1", "p1", 1, "allocated").unwrap();
        BatchEvent::item_added(&batch, "order-1")
    }

    fn header_keys(headers: &OwnedHeaders) -> Vec<String> {
        headers.iter().map(|h| h.key.to_string()).collect()
    }

    #[test]
    fn test_headers_for_item_scoped_event() {
        let headers = KafkaBatchEventPublisher::headers_for(&sample_event());
        assert_eq!(
            header_keys(&headers),
            vec!["event_type", "batch_id", "product_id", "order_id", "timestamp"]
        );
    }

    #[test]
    fn test_headers_omit_order_id_for_batch_scoped_event() {
        let batch = Batch::new("BATCH-p1-20240101000000".to_string(), "p1".to_string());
        let headers = KafkaBatchEventPublisher::headers_for(&BatchEvent::created(&batch));
        assert!(!header_keys(&headers).contains(&"order_id".to_string()));
    }

    #[test]
    fn test_timestamp_header_is_rfc3339() {
        let event = sample_event();
        let headers = KafkaBatchEventPublisher::headers_for(&event);
        let timestamp = headers
            .iter()
            .find(|h| h.key == "timestamp")
            .and_then(|h| h.value)
            .map(|v| String::from_utf8(v.to_vec()).unwrap())
            .unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
    }

    #[test]
    fn test_new_writer_starts_ready() {
        // producer construction is lazy, no broker needed
        let publisher =
            KafkaBatchEventPublisher::new("localhost:9092", "warehouse-batch-events".to_string())
                .unwrap();
        assert_eq!(publisher.topic, "warehouse-batch-events");
        assert_eq!(publisher.brokers, "localhost:9092");
        assert_eq!(
            publisher.writer.try_lock().unwrap().state,
            WriterState::Ready
        );
    }
}
