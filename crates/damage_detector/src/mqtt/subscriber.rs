use crate::domain::DetectorService;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Run the sensor subscriber: connect, subscribe to the sensor topic,
/// and dispatch each publish to the detector service until shutdown.
///
/// Connection loss is not fatal: the component stays alive, logs the
/// error, and reconnects after a fixed delay. The library's event loop
/// re-dials with the same clean-session options, so no retry state is
/// held here. Only cancellation ends the loop.
#[instrument(name = "sensor_subscriber", skip_all, fields(topic = %sensor_topic))]
pub async fn run_sensor_subscriber(
    options: MqttOptions,
    sensor_topic: String,
    retry_delay: Duration,
    service: Arc<DetectorService>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        if shutdown.is_cancelled() {
            debug!("sensor subscriber cancelled before connection");
            return Ok(());
        }

        match run_connection(options.clone(), &sensor_topic, &service, &shutdown).await {
            Ok(()) => {
                debug!("sensor subscriber stopped cleanly");
                return Ok(());
            }
            Err(err) => {
                error!(error = %err, "MQTT connection error");
                warn!(delay_ms = retry_delay.as_millis() as u64, "reconnecting to MQTT broker");

                tokio::select! {
                    _ = shutdown.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
        }
    }
}

/// Run a single MQTT connection session.
async fn run_connection(
    options: MqttOptions,
    sensor_topic: &str,
    service: &Arc<DetectorService>,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let (client, mut eventloop) = AsyncClient::new(options, 100);

    client
        .subscribe(sensor_topic, QoS::AtLeastOnce)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to subscribe to {sensor_topic}: {err}"))?;

    info!(topic = %sensor_topic, "subscribed to sensor topic");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("shutdown signal received");
                let _ = client.disconnect().await;
                return Ok(());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        service.handle_payload(&publish.topic, &publish.payload).await;
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        debug!("subscription acknowledged");
                    }
                    Ok(_) => {
                        // other packets (pings, outgoing acks)
                    }
                    Err(err) => {
                        anyhow::bail!("MQTT event loop error: {err}");
                    }
                }
            }
        }
    }
}
