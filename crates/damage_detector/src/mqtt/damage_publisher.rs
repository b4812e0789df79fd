use async_trait::async_trait;
use coldchain_domain::{DamageEvent, DamageEventSink, DomainError, DomainResult};
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Publishes damage events to the MQTT damage topic (QoS 1, not
/// retained) over its own client connection, independent of the
/// subscriber connection.
pub struct MqttDamagePublisher {
    client: AsyncClient,
    topic: String,
}

impl MqttDamagePublisher {
    /// Create the publisher and spawn its connection driver. The driver
    /// polls the event loop until shutdown; poll errors are logged and
    /// the library reconnects on the next poll.
    pub fn new(options: MqttOptions, topic: String, shutdown: CancellationToken) -> Self {
        let (client, mut eventloop) = AsyncClient::new(options, 100);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("MQTT publisher connection driver stopping");
                        break;
                    }
                    event = eventloop.poll() => {
                        if let Err(err) = event {
                            warn!(error = %err, "MQTT publisher connection error");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        });

        Self { client, topic }
    }

    pub async fn disconnect(&self) {
        let _ = self.client.disconnect().await;
    }
}

#[async_trait]
impl DamageEventSink for MqttDamagePublisher {
    async fn publish_damage_event(&self, event: &DamageEvent) -> DomainResult<()> {
        let payload = serde_json::to_vec(event)?;

        self.client
            .publish(&self.topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|err| {
                DomainError::RepositoryError(anyhow::anyhow!(
                    "Failed to publish damage event to MQTT: {err}"
                ))
            })?;

        debug!(
            topic = %self.topic,
            order_id = %event.order_id,
            severity = %event.severity,
            "published damage event to MQTT"
        );
        Ok(())
    }
}
