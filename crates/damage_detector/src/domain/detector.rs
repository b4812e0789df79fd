use crate::domain::ReadingLog;
use coldchain_domain::{DamageEvent, DamageEventSink, SensorReading, TemperatureRange};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Per-sink publish timeout. Each sink is attempted independently; a
/// slow or failed sink never blocks the other.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Applies the damage threshold to incoming sensor readings and fans
/// matching readings out to the configured sinks as damage events.
///
/// The threshold range is shared with the HTTP control plane behind a
/// read/write lock; updates are visible to in-flight handlers on their
/// next read.
pub struct DetectorService {
    range: Arc<RwLock<TemperatureRange>>,
    reading_log: Arc<ReadingLog>,
    sinks: Vec<Arc<dyn DamageEventSink>>,
    source: String,
}

impl DetectorService {
    pub fn new(
        range: Arc<RwLock<TemperatureRange>>,
        reading_log: Arc<ReadingLog>,
        sinks: Vec<Arc<dyn DamageEventSink>>,
        source: String,
    ) -> Self {
        Self {
            range,
            reading_log,
            sinks,
            source,
        }
    }

    /// Handle one raw MQTT payload. Malformed payloads are logged and
    /// dropped; publish failures are logged per sink and not retried
    /// here (broker durability upstream and downstream owns redelivery).
    pub async fn handle_payload(&self, topic: &str, payload: &[u8]) {
        let reading: SensorReading = match serde_json::from_slice(payload) {
            Ok(reading) => reading,
            Err(err) => {
                warn!(
                    topic = %topic,
                    error = %err,
                    payload_size = payload.len(),
                    "dropping malformed sensor reading"
                );
                return;
            }
        };

        debug!(
            reading_id = %reading.id,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "received sensor reading"
        );

        self.reading_log.record(reading.clone()).await;

        let range = *self.range.read().await;
        if !range.is_damaging(reading.temperature) {
            return;
        }

        let event = DamageEvent::from_reading(&reading, &self.source, topic);
        info!(
            order_id = %event.order_id,
            severity = %event.severity,
            temperature = reading.temperature,
            min_temperature = range.min_temperature,
            "reading below threshold, publishing damage event"
        );

        for sink in &self.sinks {
            match tokio::time::timeout(PUBLISH_TIMEOUT, sink.publish_damage_event(&event)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(order_id = %event.order_id, error = %err, "failed to publish damage event");
                }
                Err(_) => {
                    error!(
                        order_id = %event.order_id,
                        timeout_secs = PUBLISH_TIMEOUT.as_secs(),
                        "damage event publish timed out"
                    );
                }
            }
        }
    }
}
