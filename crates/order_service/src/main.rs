use coldchain_domain::OrderEventPublisher;
use coldchain_fabric::{init_telemetry, TelemetryConfig};
use coldchain_runner::Runner;
use order_service::amqp::{AmqpOrderEventPublisher, DamageEventConsumer};
use order_service::config::OrderServiceConfig;
use order_service::domain::{InMemoryOrderRepository, OrderService};
use order_service::http::{router, AppState};
use order_service::kafka::KafkaOrderEventProducer;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match OrderServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_telemetry(&TelemetryConfig {
        service_name: "order-service".to_string(),
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {err}");
        std::process::exit(1);
    }

    let broker_url = config.broker_url();
    info!(
        exchange = %config.exchange,
        consumer_queue = %config.consumer_queue,
        publisher_queue = %config.publisher_queue,
        "starting order-service"
    );

    let (connection, channel) = match coldchain_fabric::amqp::connect(&broker_url).await {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to connect to queue broker");
            std::process::exit(1);
        }
    };

    let amqp_publisher = match AmqpOrderEventPublisher::new(
        channel.clone(),
        config.exchange.clone(),
        config.publisher_queue.clone(),
        config.publisher_routing_key.clone(),
    )
    .await
    {
        Ok(publisher) => Arc::new(publisher),
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to set up order event publisher");
            std::process::exit(1);
        }
    };

    let kafka_publisher = match KafkaOrderEventProducer::new(
        &config.kafka_brokers,
        config.kafka_order_events_topic.clone(),
    ) {
        Ok(producer) => Arc::new(producer),
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to create Kafka producer");
            std::process::exit(1);
        }
    };

    let kafka_publisher_for_close = kafka_publisher.clone();
    let publishers: Vec<Arc<dyn OrderEventPublisher>> = vec![amqp_publisher, kafka_publisher];
    let service = Arc::new(OrderService::new(
        Arc::new(InMemoryOrderRepository::new()),
        publishers,
    ));

    let consumer = match DamageEventConsumer::new(
        channel,
        config.exchange.clone(),
        config.consumer_queue.clone(),
        config.consumer_routing_key.clone(),
        service.clone(),
    )
    .await
    {
        Ok(consumer) => consumer,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to set up damage event consumer");
            std::process::exit(1);
        }
    };

    let http_state = AppState { service };
    let http_port = config.http_port;

    let runner = Runner::new()
        .with_named_process("damage_consumer", move |ctx| consumer.run(ctx))
        .with_named_process("http_server", move |ctx| {
            coldchain_fabric::http::serve(router(http_state), http_port, ctx)
        })
        .with_closer(move || async move {
            kafka_publisher_for_close.flush().await?;
            connection
                .close(0, "shutdown")
                .await
                .map_err(|err| anyhow::anyhow!("closing broker connection: {err}"))
        })
        .with_closer_timeout(std::time::Duration::from_secs(10));

    runner.run().await;
}
