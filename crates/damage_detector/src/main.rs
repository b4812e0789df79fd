use coldchain_domain::TemperatureRange;
use coldchain_fabric::{init_telemetry, TelemetryConfig};
use coldchain_runner::Runner;
use damage_detector::config::DetectorConfig;
use damage_detector::domain::{DetectorService, ReadingLog};
use damage_detector::http::{router, AppState};
use damage_detector::kafka::KafkaDamageProducer;
use damage_detector::mqtt::{run_sensor_subscriber, MqttDamagePublisher};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Retained readings exposed on the /events endpoints.
const READING_LOG_CAPACITY: usize = 1000;

#[tokio::main]
async fn main() {
    let config = match DetectorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_telemetry(&TelemetryConfig {
        service_name: "damage-detector".to_string(),
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {err}");
        std::process::exit(1);
    }

    info!(
        broker = %config.mqtt_broker_url,
        sensor_topic = %config.sensor_topic,
        damage_topic = %config.damage_topic,
        "starting damage-detector"
    );

    let range = match TemperatureRange::new(config.min_temperature, config.max_temperature) {
        Ok(range) => Arc::new(RwLock::new(range)),
        Err(err) => {
            error!(error = %err, "invalid configured temperature range");
            std::process::exit(1);
        }
    };

    let subscriber_options = match coldchain_fabric::mqtt::mqtt_options(
        &config.mqtt_broker_url,
        &config.mqtt_client_id,
        config.mqtt_username.as_deref(),
        config.mqtt_password.as_deref(),
    ) {
        Ok(options) => options,
        Err(err) => {
            error!(error = %err, "invalid MQTT broker URL");
            std::process::exit(1);
        }
    };
    let publisher_options = match coldchain_fabric::mqtt::mqtt_options(
        &config.mqtt_broker_url,
        &format!("{}-pub", config.mqtt_client_id),
        config.mqtt_username.as_deref(),
        config.mqtt_password.as_deref(),
    ) {
        Ok(options) => options,
        Err(err) => {
            error!(error = %err, "invalid MQTT broker URL");
            std::process::exit(1);
        }
    };

    let shutdown_token = CancellationToken::new();

    let mqtt_sink = Arc::new(MqttDamagePublisher::new(
        publisher_options,
        config.damage_topic.clone(),
        shutdown_token.clone(),
    ));

    let kafka_sink =
        match KafkaDamageProducer::new(&config.kafka_brokers, config.kafka_damage_topic.clone()) {
            Ok(producer) => Arc::new(producer),
            Err(err) => {
                error!(error = %err, "failed to create Kafka producer");
                std::process::exit(1);
            }
        };
    let kafka_sink_for_close = kafka_sink.clone();

    let reading_log = Arc::new(ReadingLog::new(READING_LOG_CAPACITY));
    let service = Arc::new(DetectorService::new(
        range.clone(),
        reading_log.clone(),
        vec![mqtt_sink.clone(), kafka_sink],
        "damage-detector".to_string(),
    ));

    let http_state = AppState {
        range,
        reading_log,
    };
    let http_port = config.http_port;

    let runner = Runner::new()
        .with_cancellation_token(shutdown_token.clone())
        .with_named_process("sensor_subscriber", {
            let options = subscriber_options;
            let topic = config.sensor_topic.clone();
            let retry_delay = config.mqtt_retry_delay();
            move |ctx| run_sensor_subscriber(options, topic, retry_delay, service, ctx)
        })
        .with_named_process("http_server", move |ctx| {
            coldchain_fabric::http::serve(router(http_state), http_port, ctx)
        })
        .with_closer(move || async move {
            mqtt_sink.disconnect().await;
            kafka_sink_for_close.flush().await
        })
        .with_closer_timeout(std::time::Duration::from_secs(10));

    runner.run().await;
}
