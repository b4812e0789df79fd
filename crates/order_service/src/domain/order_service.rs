use coldchain_domain::{
    order_event_type, status_for_severity, DamageEvent, DomainError, DomainResult, Order,
    OrderEvent, OrderEventPublisher, OrderRepository,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Owns the Order aggregate. Every mutation, whether driven by a damage
/// event or by the HTTP API, goes through this service so the
/// create-on-missing and status rules hold on both paths.
pub struct OrderService {
    order_repo: Arc<dyn OrderRepository>,
    publishers: Vec<Arc<dyn OrderEventPublisher>>,
}

impl OrderService {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        publishers: Vec<Arc<dyn OrderEventPublisher>>,
    ) -> Self {
        Self {
            order_repo,
            publishers,
        }
    }

    /// Create an order through the API path and emit `order.created`.
    /// Publish failures are logged but do not fail the creation; the
    /// aggregate is already persisted.
    pub async fn create_order(
        &self,
        customer_id: String,
        product_id: String,
        quantity: u32,
        total_amount: f64,
    ) -> DomainResult<Order> {
        let now = chrono::Utc::now();
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id,
            product_id,
            quantity,
            status: coldchain_domain::order_status::CREATED.to_string(),
            total_amount,
            created_at: now,
            updated_at: now,
        };

        self.order_repo.save(order.clone()).await?;
        self.publish_best_effort(OrderEvent::new(order_event_type::CREATED, order.clone()))
            .await;

        info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            product_id = %order.product_id,
            "order created"
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: &str) -> DomainResult<Option<Order>> {
        self.order_repo.find_by_id(id).await
    }

    pub async fn list_orders(&self) -> DomainResult<Vec<Order>> {
        self.order_repo.find_all().await
    }

    /// Update an order's status through the API path and emit
    /// `order.updated`.
    pub async fn update_order_status(&self, id: &str, status: String) -> DomainResult<Order> {
        let mut order = self
            .order_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(id.to_string()))?;

        order.status = status;
        order.updated_at = chrono::Utc::now();
        self.order_repo.update(order.clone()).await?;

        self.publish_best_effort(OrderEvent::new(order_event_type::UPDATED, order.clone()))
            .await;

        info!(order_id = %order.id, status = %order.status, "order status updated");
        Ok(order)
    }

    /// Apply a damage event to the aggregate.
    ///
    /// Creates a placeholder order when the id is unknown, transitions
    /// the status from the event's severity, and publishes exactly one
    /// `order.damage_processed` event carrying the updated snapshot.
    /// The publishers are independent sinks: every one is attempted and
    /// failures are logged, never allowed to starve the others.
    #[instrument(skip_all, fields(order_id = %event.order_id, severity = %event.severity))]
    pub async fn handle_damage_event(&self, event: DamageEvent) -> DomainResult<()> {
        let mut order = match self.order_repo.find_by_id(&event.order_id).await? {
            Some(order) => order,
            None => {
                info!("order unknown, creating from damage event");
                let order = Order::from_damage_event(&event);
                self.order_repo.save(order.clone()).await?;
                order
            }
        };

        let new_status = status_for_severity(event.severity);
        warn!(
            temperature = event.details.temperature,
            humidity = event.details.humidity,
            new_status = %new_status,
            "damage detected for order"
        );

        order.status = new_status.to_string();
        order.updated_at = chrono::Utc::now();
        self.order_repo.update(order.clone()).await?;

        let order_event = OrderEvent::new(order_event_type::DAMAGE_PROCESSED, order);
        let status = order_event.order.status.clone();
        self.publish_best_effort(order_event).await;

        info!(status = %status, "damage event processed");
        Ok(())
    }

    /// Publish to all sinks, logging failures instead of propagating.
    async fn publish_best_effort(&self, event: OrderEvent) {
        for publisher in &self.publishers {
            if let Err(err) = publisher.publish_order_event(&event).await {
                error!(
                    event_type = %event.event_type,
                    order_id = %event.order_id,
                    error = %err,
                    "failed to publish order event"
                );
            }
        }
    }
}
