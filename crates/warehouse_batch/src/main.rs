use coldchain_fabric::{init_telemetry, TelemetryConfig};
use coldchain_runner::Runner;
use std::sync::Arc;
use tracing::{error, info};
use warehouse_batch::config::WarehouseConfig;
use warehouse_batch::domain::{BatchService, InMemoryBatchRepository, OrderEventHandler};
use warehouse_batch::http::{router, AppState};
use warehouse_batch::kafka::{KafkaBatchEventPublisher, OrderEventConsumer};

#[tokio::main]
async fn main() {
    let config = match WarehouseConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_telemetry(&TelemetryConfig {
        service_name: "warehouse-batch".to_string(),
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {err}");
        std::process::exit(1);
    }

    info!(
        brokers = %config.kafka_brokers,
        order_events_topic = %config.order_events_topic,
        batch_events_topic = %config.batch_events_topic,
        group_id = %config.group_id,
        "starting warehouse-batch"
    );

    let publisher = match KafkaBatchEventPublisher::new(
        &config.kafka_brokers,
        config.batch_events_topic.clone(),
    ) {
        Ok(publisher) => Arc::new(publisher),
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to create batch event publisher");
            std::process::exit(1);
        }
    };

    let batch_service = Arc::new(BatchService::new(
        Arc::new(InMemoryBatchRepository::new()),
        publisher.clone(),
    ));
    let handler = Arc::new(OrderEventHandler::new(batch_service.clone()));

    let consumer = match OrderEventConsumer::new(
        &config.kafka_brokers,
        &config.order_events_topic,
        &config.group_id,
        handler,
    ) {
        Ok(consumer) => consumer,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to create order event consumer");
            std::process::exit(1);
        }
    };

    let http_state = AppState {
        service: batch_service,
    };
    let http_port = config.http_port;

    let runner = Runner::new()
        .with_named_process("order_event_consumer", move |ctx| consumer.run(ctx))
        .with_named_process("http_server", move |ctx| {
            coldchain_fabric::http::serve(router(http_state), http_port, ctx)
        })
        .with_closer(move || async move { publisher.flush().await })
        .with_closer_timeout(std::time::Duration::from_secs(10));

    runner.run().await;
}
