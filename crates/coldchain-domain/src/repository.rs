use crate::batch::{Batch, BatchEvent, BatchStatus};
use crate::error::DomainResult;
use crate::order::{Order, OrderEvent};
use crate::sensor::DamageEvent;
use async_trait::async_trait;

/// Storage seam for the Order aggregate. The in-memory implementation
/// lives in the order service; a disk-backed variant implements the same
/// trait without touching callers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: Order) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Order>>;

    async fn find_all(&self) -> DomainResult<Vec<Order>>;

    async fn update(&self, order: Order) -> DomainResult<()>;

    async fn delete(&self, id: &str) -> DomainResult<()>;
}

/// Storage seam for the Batch aggregate.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn save(&self, batch: Batch) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Batch>>;

    async fn find_by_product_id(&self, product_id: &str) -> DomainResult<Vec<Batch>>;

    async fn find_by_status(&self, status: BatchStatus) -> DomainResult<Vec<Batch>>;

    /// The batch containing a given order, if any. Order ids are unique
    /// across open batches in practice because the order service owns
    /// order identity.
    async fn find_by_order_id(&self, order_id: &str) -> DomainResult<Option<Batch>>;

    /// The single open (pending) batch for a product, if one exists.
    async fn find_pending_for_product(&self, product_id: &str) -> DomainResult<Option<Batch>>;

    async fn delete(&self, id: &str) -> DomainResult<()>;

    async fn find_all(&self) -> DomainResult<Vec<Batch>>;
}

/// Sink for damage events. The detector fans out to two independent
/// implementations (MQTT topic and log-broker topic).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DamageEventSink: Send + Sync {
    async fn publish_damage_event(&self, event: &DamageEvent) -> DomainResult<()>;
}

/// Publisher seam for order lifecycle events.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OrderEventPublisher: Send + Sync {
    async fn publish_order_event(&self, event: &OrderEvent) -> DomainResult<()>;
}

/// Publisher seam for batch lifecycle events.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BatchEventPublisher: Send + Sync {
    async fn publish_batch_event(&self, event: &BatchEvent) -> DomainResult<()>;
}
