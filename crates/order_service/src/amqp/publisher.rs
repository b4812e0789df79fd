use async_trait::async_trait;
use coldchain_domain::{DomainError, DomainResult, OrderEvent, OrderEventPublisher};
use coldchain_fabric::amqp::declare_bound_queue;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel};
use tracing::{debug, info};

/// Publishes order lifecycle events onto the queue broker. Declares the
/// outbound queue and binding on construction so a fresh broker works
/// without manual topology setup.
pub struct AmqpOrderEventPublisher {
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl AmqpOrderEventPublisher {
    pub async fn new(
        channel: Channel,
        exchange: String,
        queue: String,
        routing_key: String,
    ) -> anyhow::Result<Self> {
        declare_bound_queue(&channel, &exchange, &queue, &routing_key).await?;

        info!(
            exchange = %exchange,
            queue = %queue,
            routing_key = %routing_key,
            "order event publisher ready"
        );

        Ok(Self {
            channel,
            exchange,
            routing_key,
        })
    }
}

#[async_trait]
impl OrderEventPublisher for AmqpOrderEventPublisher {
    async fn publish_order_event(&self, event: &OrderEvent) -> DomainResult<()> {
        let payload = serde_json::to_vec(event)?;

        self.channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await
            .map_err(|err| {
                DomainError::RepositoryError(anyhow::anyhow!(
                    "Failed to publish order event: {err}"
                ))
            })?
            .await
            .map_err(|err| {
                DomainError::RepositoryError(anyhow::anyhow!(
                    "Order event publish not confirmed: {err}"
                ))
            })?;

        debug!(
            event_type = %event.event_type,
            order_id = %event.order_id,
            "published order event"
        );
        Ok(())
    }
}
