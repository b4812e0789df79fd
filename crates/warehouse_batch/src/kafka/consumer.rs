use crate::domain::OrderEventHandler;
use coldchain_domain::{DomainError, OrderEvent};
use coldchain_fabric::kafka::stream_consumer;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long one poll waits for a message before looping. Elapsed polls
/// are expected when the topic is quiet.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Consumes order lifecycle events from the log broker in a durable
/// consumer group, resuming from the last committed offset.
///
/// Offsets are committed after the handler disposition: handled events
/// and skippable failures (poison payloads, domain rule violations)
/// commit so the partition keeps moving; repository or transport
/// failures leave the offset uncommitted for redelivery.
pub struct OrderEventConsumer {
    consumer: StreamConsumer,
    handler: Arc<OrderEventHandler>,
}

impl OrderEventConsumer {
    pub fn new(
        brokers: &str,
        topic: &str,
        group_id: &str,
        handler: Arc<OrderEventHandler>,
    ) -> anyhow::Result<Self> {
        let consumer = stream_consumer(brokers, group_id, topic)?;
        info!(topic = %topic, group_id = %group_id, "order event consumer created");
        Ok(Self { consumer, handler })
    }

    pub async fn run(self, ctx: CancellationToken) -> anyhow::Result<()> {
        info!("starting order event consumer loop");

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("order event consumer stopping");
                    return Ok(());
                }
                polled = tokio::time::timeout(READ_TIMEOUT, self.consumer.recv()) => {
                    match polled {
                        Err(_elapsed) => {
                            // quiet topic; poll again
                        }
                        Ok(Err(err)) => {
                            error!(error = %err, "error reading order event");
                            tokio::time::sleep(Duration::from_secs(2)).await;
                        }
                        Ok(Ok(message)) => {
                            self.dispatch(&message).await;
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&self, message: &BorrowedMessage<'_>) {
        let Some(payload) = message.payload() else {
            warn!(offset = message.offset(), "message has no payload, skipping");
            self.commit(message);
            return;
        };

        let event: OrderEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                error!(
                    offset = message.offset(),
                    error = %err,
                    "undecodable order event, skipping"
                );
                self.commit(message);
                return;
            }
        };

        debug!(
            event_type = %event.event_type,
            order_id = %event.order_id,
            offset = message.offset(),
            "received order event"
        );

        match self.handler.handle_order_event(event).await {
            Ok(()) => self.commit(message),
            Err(DomainError::RepositoryError(err)) => {
                // leave the offset uncommitted; the event is redelivered
                error!(error = %err, "repository failure handling order event");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(err) => {
                // domain rule violations cannot be repaired by retrying
                warn!(error = %err, "order event violated a domain rule, skipping");
                self.commit(message);
            }
        }
    }

    fn commit(&self, message: &BorrowedMessage<'_>) {
        if let Err(err) = self.consumer.commit_message(message, CommitMode::Async) {
            error!(error = %err, "failed to commit offset");
        }
    }
}
