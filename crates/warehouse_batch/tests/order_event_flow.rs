//! End-to-end scenarios for the order-event → batch pipeline, driven
//! through the handler against the real in-memory repository with a
//! recording publisher in place of the broker.

use async_trait::async_trait;
use coldchain_domain::{
    batch_event_type, order_status, BatchEvent, BatchEventPublisher, BatchRepository, BatchStatus,
    DomainResult, Order, OrderEvent,
};
use std::sync::{Arc, Mutex};
use warehouse_batch::domain::{BatchService, InMemoryBatchRepository, OrderEventHandler};

struct RecordingPublisher {
    events: Mutex<Vec<BatchEvent>>,
}

impl RecordingPublisher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl BatchEventPublisher for RecordingPublisher {
    async fn publish_batch_event(&self, event: &BatchEvent) -> DomainResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct Pipeline {
    handler: OrderEventHandler,
    repo: Arc<InMemoryBatchRepository>,
    publisher: Arc<RecordingPublisher>,
}

fn pipeline() -> Pipeline {
    let repo = Arc::new(InMemoryBatchRepository::new());
    let publisher = RecordingPublisher::new();
    let service = Arc::new(BatchService::new(repo.clone(), publisher.clone()));
    Pipeline {
        handler: OrderEventHandler::new(service),
        repo,
        publisher,
    }
}

fn order_event(event_type: &str, order_id: &str, product_id: &str, status: &str) -> OrderEvent {
    let now = chrono::Utc::now();
    OrderEvent {
        event_type: event_type.to_string(),
        order_id: order_id.to_string(),
        order: Order {
            id: order_id.to_string(),
            customer_id: "unknown".to_string(),
            product_id: product_id.to_string(),
            quantity: 1,
            status: status.to_string(),
            total_amount: 0.0,
            created_at: now,
            updated_at: now,
        },
        timestamp: now,
    }
}

/// A minor damage event for an untracked order creates a batch holding
/// one item in `damage_minor` and emits created + item_added.
#[tokio::test]
async fn minor_damage_creates_batch_for_unknown_order() {
    let p = pipeline();

    p.handler
        .handle_order_event(order_event(
            "order.damage_processed",
            "evt_1",
            "unknown",
            order_status::DAMAGE_DETECTED_MINOR,
        ))
        .await
        .unwrap();

    let batch = p.repo.find_by_order_id("evt_1").await.unwrap().unwrap();
    assert!(batch.id.starts_with("BATCH-unknown-"));
    assert_eq!(batch.status, BatchStatus::Pending);
    assert_eq!(batch.item("evt_1").unwrap().status, "damage_minor");

    assert_eq!(
        p.publisher.event_types(),
        vec![batch_event_type::CREATED, batch_event_type::ITEM_ADDED]
    );
}

/// `cancelled_damage` matches no damage sub-rule: logged, no mutation.
#[tokio::test]
async fn critical_damage_status_causes_no_batch_mutation() {
    let p = pipeline();

    p.handler
        .handle_order_event(order_event(
            "order.damage_processed",
            "evt_2",
            "unknown",
            order_status::CANCELLED_DAMAGE,
        ))
        .await
        .unwrap();

    assert!(p.repo.find_all().await.unwrap().is_empty());
    assert!(p.publisher.event_types().is_empty());
}

/// Two created orders for the same product share one pending batch.
#[tokio::test]
async fn two_orders_one_product_share_a_pending_batch() {
    let p = pipeline();

    for order_id in ["order-1", "order-2"] {
        p.handler
            .handle_order_event(order_event(
                "order.created",
                order_id,
                "p1",
                order_status::CREATED,
            ))
            .await
            .unwrap();
    }

    let pending = p.repo.find_by_status(BatchStatus::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].total_items, 2);
    assert!(pending[0].has_order("order-1"));
    assert!(pending[0].has_order("order-2"));

    assert_eq!(
        p.publisher.event_types(),
        vec![
            batch_event_type::CREATED,
            batch_event_type::ITEM_ADDED,
            batch_event_type::ITEM_ADDED,
        ]
    );
}

/// Cancelling the sole order removes the item and deletes the batch.
#[tokio::test]
async fn cancelling_sole_order_deletes_batch() {
    let p = pipeline();

    p.handler
        .handle_order_event(order_event(
            "order.created",
            "order-1",
            "p1",
            order_status::CREATED,
        ))
        .await
        .unwrap();
    p.handler
        .handle_order_event(order_event(
            "order.cancelled",
            "order-1",
            "p1",
            "cancelled",
        ))
        .await
        .unwrap();

    assert!(p.repo.find_by_product_id("p1").await.unwrap().is_empty());
    assert!(p
        .publisher
        .event_types()
        .contains(&batch_event_type::ITEM_REMOVED.to_string()));
}

/// Major damage pulls the order into a batch and marks the whole batch
/// damaged.
#[tokio::test]
async fn major_damage_marks_batch_damaged() {
    let p = pipeline();

    p.handler
        .handle_order_event(order_event(
            "order.created",
            "order-1",
            "p1",
            order_status::CREATED,
        ))
        .await
        .unwrap();
    p.handler
        .handle_order_event(order_event(
            "order.damage_processed",
            "order-1",
            "p1",
            order_status::DAMAGE_DETECTED_MAJOR,
        ))
        .await
        .unwrap();

    let batch = p.repo.find_by_order_id("order-1").await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Damaged);
    assert_eq!(batch.item("order-1").unwrap().status, "damage_major");
    assert!(p
        .publisher
        .event_types()
        .contains(&batch_event_type::MARKED_DAMAGED.to_string()));

    // a second major damage event updates the item but the batch stays
    // terminal; the handler does not error the delivery
    p.handler
        .handle_order_event(order_event(
            "order.damage_processed",
            "order-1",
            "p1",
            order_status::DAMAGE_DETECTED_MAJOR,
        ))
        .await
        .unwrap();
}

/// A returned order keeps its item and gains a `<id>-return` item.
#[tokio::test]
async fn returned_order_adds_return_item() {
    let p = pipeline();

    p.handler
        .handle_order_event(order_event(
            "order.created",
            "order-1",
            "p1",
            order_status::CREATED,
        ))
        .await
        .unwrap();
    p.handler
        .handle_order_event(order_event("order.returned", "order-1", "p1", "returned"))
        .await
        .unwrap();

    let batch = p.repo.find_by_order_id("order-1").await.unwrap().unwrap();
    assert_eq!(batch.item("order-1").unwrap().status, "returned");
    assert_eq!(batch.item("order-1-return").unwrap().status, "returned");
    assert_eq!(batch.total_items, 2);
}

/// Shipped then delivered updates the item and stamps processed_at.
#[tokio::test]
async fn shipped_and_delivered_update_item() {
    let p = pipeline();

    p.handler
        .handle_order_event(order_event(
            "order.created",
            "order-1",
            "p1",
            order_status::CREATED,
        ))
        .await
        .unwrap();
    p.handler
        .handle_order_event(order_event("order.shipped", "order-1", "p1", "shipped"))
        .await
        .unwrap();

    let batch = p.repo.find_by_order_id("order-1").await.unwrap().unwrap();
    let item = batch.item("order-1").unwrap();
    assert_eq!(item.status, "shipped");
    assert!(item.processed_at.is_some());

    p.handler
        .handle_order_event(order_event("order.delivered", "order-1", "p1", "delivered"))
        .await
        .unwrap();
    let batch = p.repo.find_by_order_id("order-1").await.unwrap().unwrap();
    assert_eq!(batch.item("order-1").unwrap().status, "delivered");
}

/// Replaying the same created event leaves the batch state equal modulo
/// timestamps.
#[tokio::test]
async fn replayed_created_event_is_idempotent()  {
    let p = pipeline();
    let event = order_event("order.created", "order-1", "p1", order_status::CREATED);

    p.handler.handle_order_event(event.clone()).await.unwrap();
    let before = p.repo.find_by_order_id("order-1").await.unwrap().unwrap();

    p.handler.handle_order_event(event).await.unwrap();
    let after = p.repo.find_by_order_id("order-1").await.unwrap().unwrap();

    assert_eq!(before.id, after.id);
    assert_eq!(before.total_items, after.total_items);
    assert_eq!(
        before.item("order-1").unwrap().status,
        after.item("order-1").unwrap().status
    );
}

/// Irrelevant event types are skipped without touching state.
#[tokio::test]
async fn irrelevant_events_are_skipped() {
    let p = pipeline();

    p.handler
        .handle_order_event(order_event(
            "order.updated",
            "order-1",
            "p1",
            "whatever",
        ))
        .await
        .unwrap();

    assert!(p.repo.find_all().await.unwrap().is_empty());
    assert!(p.publisher.event_types().is_empty());
}
