use anyhow::{Context, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;

/// Producer acknowledgment modes used across the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acks {
    /// Leader acknowledgment only.
    One,
    /// All in-sync replicas.
    All,
}

impl Acks {
    fn as_config_value(self) -> &'static str {
        match self {
            Acks::One => "1",
            Acks::All => "all",
        }
    }
}

/// Build a synchronous-style producer: sends are awaited with a 10 s
/// delivery timeout and the configured acknowledgment mode.
pub fn future_producer(brokers: &str, acks: Acks) -> Result<FutureProducer> {
    ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("message.timeout.ms", "10000")
        .set("acks", acks.as_config_value())
        .create()
        .context("Failed to create Kafka producer")
}

/// Build a consumer-group stream consumer with manual offset commits,
/// resuming from the last committed offset.
pub fn stream_consumer(brokers: &str, group_id: &str, topic: &str) -> Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "latest")
        .set("session.timeout.ms", "6000")
        .set("enable.partition.eof", "false")
        .create()
        .context("Failed to create Kafka consumer")?;

    consumer
        .subscribe(&[topic])
        .with_context(|| format!("Failed to subscribe to topic {topic}"))?;

    Ok(consumer)
}

/// Broker error strings that mean the target topic or partition does not
/// exist yet (error code 3). Matched case-insensitively against the
/// rendered error because the text varies across broker and client
/// versions.
const UNKNOWN_TOPIC_MARKERS: [&str; 4] = [
    "[3] unknown topic or partition",
    "unknowntopicorpartition",
    "unknown topic or partition",
    "topic or partition that does not exist",
];

/// True when a publish error indicates a missing topic/partition and a
/// writer rebuild plus retry may succeed.
pub fn is_unknown_topic_or_partition(error: &impl std::fmt::Display) -> bool {
    let text = error.to_string().to_lowercase();
    UNKNOWN_TOPIC_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_topic_matcher() {
        assert!(is_unknown_topic_or_partition(
            &"Message production error: UnknownTopicOrPartition (Broker: Unknown topic or partition)"
        ));
        assert!(is_unknown_topic_or_partition(
            &"[3] Unknown Topic Or Partition"
        ));
        assert!(is_unknown_topic_or_partition(
            &"the request is for a topic or partition that does not exist"
        ));
        assert!(!is_unknown_topic_or_partition(&"Broker transport failure"));
        assert!(!is_unknown_topic_or_partition(&"Message timed out"));
    }

    #[test]
    fn test_acks_config_values() {
        assert_eq!(Acks::One.as_config_value(), "1");
        assert_eq!(Acks::All.as_config_value(), "all");
    }
}
