use crate::domain::BatchService;
use coldchain_domain::{order_status, DomainError, DomainResult, OrderEvent};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Warehouse-side action derived from an order lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseAction {
    ProcessDamage,
    AllocateInventory,
    ReleaseInventory,
    UpdateInventory,
    ConfirmDelivery,
    ProcessReturn,
    ConfirmAllocation,
    ConfirmRelease,
}

/// Map an order event type to its warehouse action. Event types outside
/// the closed set are not warehouse-relevant.
pub fn warehouse_action(event_type: &str) -> Option<WarehouseAction> {
    match event_type {
        "order.damage_processed" => Some(WarehouseAction::ProcessDamage),
        "order.created" => Some(WarehouseAction::AllocateInventory),
        "order.cancelled" => Some(WarehouseAction::ReleaseInventory),
        "order.shipped" => Some(WarehouseAction::UpdateInventory),
        "order.delivered" => Some(WarehouseAction::ConfirmDelivery),
        "order.returned" => Some(WarehouseAction::ProcessReturn),
        "order.inventory_allocated" => Some(WarehouseAction::ConfirmAllocation),
        "order.inventory_released" => Some(WarehouseAction::ConfirmRelease),
        _ => None,
    }
}

/// Drives the batch aggregate from the order event stream.
pub struct OrderEventHandler {
    batch_service: Arc<BatchService>,
}

impl OrderEventHandler {
    pub fn new(batch_service: Arc<BatchService>) -> Self {
        Self { batch_service }
    }

    /// Handle one order event. Events outside the warehouse vocabulary
    /// are skipped without a state change.
    #[instrument(skip_all, fields(event_type = %event.event_type, order_id = %event.order_id))]
    pub async fn handle_order_event(&self, event: OrderEvent) -> DomainResult<()> {
        let Some(action) = warehouse_action(&event.event_type) else {
            debug!("event not warehouse-relevant, skipping");
            return Ok(());
        };

        info!(action = ?action, "processing warehouse action");

        match action {
            WarehouseAction::ProcessDamage => self.process_damage(&event).await,
            WarehouseAction::AllocateInventory => {
                let batch = self
                    .batch_service
                    .add_order_to_batch(
                        &event.order_id,
                        &event.order.product_id,
                        event.order.quantity,
                        "allocated",
                    )
                    .await?;
                info!(batch_id = %batch.id, "order allocated to batch");
                Ok(())
            }
            WarehouseAction::ReleaseInventory => {
                self.batch_service
                    .remove_order_from_batch(&event.order_id)
                    .await
            }
            WarehouseAction::UpdateInventory => self.update_status(&event.order_id, "shipped").await,
            WarehouseAction::ConfirmDelivery => {
                self.update_status(&event.order_id, "delivered").await
            }
            WarehouseAction::ProcessReturn => {
                self.update_status(&event.order_id, "returned").await?;
                // the returned stock re-enters inventory as its own item
                self.batch_service
                    .add_order_to_batch(
                        &format!("{}-return", event.order_id),
                        &event.order.product_id,
                        event.order.quantity,
                        "returned",
                    )
                    .await?;
                Ok(())
            }
            WarehouseAction::ConfirmAllocation => {
                self.update_status(&event.order_id, "allocation_confirmed")
                    .await
            }
            WarehouseAction::ConfirmRelease => {
                self.update_status(&event.order_id, "release_confirmed")
                    .await
            }
        }
    }

    async fn update_status(&self, order_id: &str, status: &str) -> DomainResult<()> {
        self.batch_service
            .update_order_status(order_id, status)
            .await
            .map(|_| ())
    }

    /// Damage sub-rules, switched on the order status the damage event
    /// left behind. An order not yet tracked in any batch gets one
    /// created for it.
    async fn process_damage(&self, event: &OrderEvent) -> DomainResult<()> {
        match event.order.status.as_str() {
            order_status::DAMAGE_DETECTED_MINOR => {
                info!("minor damage, marking for inspection");
                self.update_or_create(event, "damage_minor").await?;
                Ok(())
            }
            order_status::DAMAGE_DETECTED_MAJOR => {
                info!("major damage, marking batch as damaged");
                let batch = self.update_or_create(event, "damage_major").await?;
                if let Err(err) = self.batch_service.mark_batch_damaged(&batch.id).await {
                    // already-damaged batches reject the transition
                    warn!(batch_id = %batch.id, error = %err, "could not mark batch as damaged");
                }
                Ok(())
            }
            "damage_processed" => {
                info!("damage processing completed");
                self.update_or_create(event, "damage_processed").await?;
                Ok(())
            }
            other => {
                warn!(status = %other, "unknown damage status, no batch mutation");
                Ok(())
            }
        }
    }

    /// Update the order's item status, or pull the order into a batch
    /// when no batch tracks it yet.
    async fn update_or_create(
        &self,
        event: &OrderEvent,
        item_status: &str,
    ) -> DomainResult<coldchain_domain::Batch> {
        match self
            .batch_service
            .update_order_status(&event.order_id, item_status)
            .await
        {
            Ok(batch) => Ok(batch),
            Err(DomainError::OrderNotInAnyBatch(_)) => {
                info!("order not in any batch, creating one for damage processing");
                self.batch_service
                    .add_order_to_batch(
                        &event.order_id,
                        &event.order.product_id,
                        event.order.quantity,
                        item_status,
                    )
                    .await
            }
            Err(err) => Err(err),
        }
    }
}
