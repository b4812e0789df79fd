use crate::domain::OrderService;
use coldchain_domain::{Delivery, DomainError};
use coldchain_fabric::amqp::declare_bound_queue;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions};
use lapin::types::FieldTable;
use lapin::Channel;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Consumes damage-event deliveries from the queue broker and drives the
/// order aggregate.
///
/// Disposition per delivery: decoded and handled → ack; handler error →
/// nack with requeue (transient, redelivery is idempotent); undecodable
/// payload → nack without requeue (poison).
pub struct DamageEventConsumer {
    channel: Channel,
    queue: String,
    service: Arc<OrderService>,
}

impl DamageEventConsumer {
    pub async fn new(
        channel: Channel,
        exchange: String,
        queue: String,
        routing_key: String,
        service: Arc<OrderService>,
    ) -> anyhow::Result<Self> {
        declare_bound_queue(&channel, &exchange, &queue, &routing_key).await?;

        Ok(Self {
            channel,
            queue,
            service,
        })
    }

    pub async fn run(self, ctx: CancellationToken) -> anyhow::Result<()> {
        let mut consumer = self
            .channel
            .basic_consume(
                &self.queue,
                "order-service",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|err| anyhow::anyhow!("Failed to start consuming {}: {err}", self.queue))?;

        info!(queue = %self.queue, "consuming damage events");

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("damage event consumer stopping");
                    return Ok(());
                }
                delivery = consumer.next() => {
                    match delivery {
                        Some(Ok(delivery)) => {
                            self.dispatch(delivery).await;
                        }
                        Some(Err(err)) => {
                            error!(error = %err, "error receiving delivery");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                        None => {
                            if ctx.is_cancelled() {
                                return Ok(());
                            }
                            anyhow::bail!("consumer stream closed unexpectedly");
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&self, delivery: lapin::message::Delivery) {
        let decoded = Delivery::decode(&delivery.data);

        match decoded {
            Ok(envelope) => {
                let event = envelope.into_damage_event();
                debug!(
                    order_id = %event.order_id,
                    severity = %event.severity,
                    "decoded damage event"
                );

                match self.service.handle_damage_event(event).await {
                    Ok(()) => {
                        if let Err(err) = delivery.acker.ack(BasicAckOptions::default()).await {
                            error!(error = %err, "failed to ack delivery");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "handler failed, requeueing delivery");
                        if let Err(nack_err) = delivery
                            .acker
                            .nack(BasicNackOptions {
                                requeue: true,
                                ..Default::default()
                            })
                            .await
                        {
                            error!(error = %nack_err, "failed to nack delivery");
                        }
                    }
                }
            }
            Err(err @ (DomainError::UnknownEnvelope | DomainError::DecodeError(_))) => {
                error!(error = %err, "poison delivery, dropping without requeue");
                if let Err(nack_err) = delivery
                    .acker
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
                {
                    error!(error = %nack_err, "failed to nack poison delivery");
                }
            }
            Err(err) => {
                // decode only returns envelope/serde errors today; treat
                // anything new as poison rather than requeue-looping it
                error!(error = %err, "unexpected decode failure, dropping delivery");
                if let Err(nack_err) = delivery
                    .acker
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
                {
                    error!(error = %nack_err, "failed to nack delivery");
                }
            }
        }
    }
}
