use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// Status of a Batch aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Damaged,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Damaged => "damaged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BatchStatus::Pending),
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "cancelled" => Some(BatchStatus::Cancelled),
            "damaged" => Some(BatchStatus::Damaged),
            _ => None,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item statuses that stamp `processed_at` when set.
const PROCESSED_ITEM_STATUSES: [&str; 3] = ["processed", "shipped", "delivered"];

/// One order inside a batch. `order_id` is unique within the batch and
/// `product_id` always matches the owning batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub order_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub status: String,
    pub added_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The Batch aggregate root, owned by the warehouse batch service.
///
/// Invariants: all items share the batch `product_id`;
/// `total_items == items.len()`; at most one pending batch exists per
/// product (enforced by the batch service's pending-batch selection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    pub status: BatchStatus,
    pub items: Vec<BatchItem>,
    pub total_items: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Batch {
    pub fn new(id: String, product_id: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            product_id,
            status: BatchStatus::Pending,
            items: Vec::new(),
            total_items: 0,
            created_at: now,
            updated_at: now,
            processed_at: None,
        }
    }

    fn frozen_error(&self) -> DomainError {
        DomainError::BatchFrozen {
            batch_id: self.id.clone(),
            status: self.status.to_string(),
        }
    }

    /// True when the batch accepts no further item mutation.
    fn items_frozen(&self) -> bool {
        matches!(
            self.status,
            BatchStatus::Completed | BatchStatus::Cancelled | BatchStatus::Damaged
        )
    }

    /// Add an order to the batch, or update it in place when the order
    /// is already present.
    pub fn add_item(
        &mut self,
        order_id: &str,
        product_id: &str,
        quantity: u32,
        status: &str,
    ) -> DomainResult<()> {
        if self.product_id != product_id {
            return Err(DomainError::ProductMismatch {
                batch_product: self.product_id.clone(),
                item_product: product_id.to_string(),
            });
        }
        if self.items_frozen() {
            return Err(self.frozen_error());
        }

        let now = chrono::Utc::now();
        if let Some(item) = self.items.iter_mut().find(|i| i.order_id == order_id) {
            item.quantity = quantity;
            item.status = status.to_string();
            item.added_at = now;
            self.updated_at = now;
            return Ok(());
        }

        self.items.push(BatchItem {
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            status: status.to_string(),
            added_at: now,
            processed_at: None,
        });
        self.total_items = self.items.len();
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_item(&mut self, order_id: &str) -> DomainResult<()> {
        if self.items_frozen() {
            return Err(self.frozen_error());
        }

        let position = self
            .items
            .iter()
            .position(|i| i.order_id == order_id)
            .ok_or_else(|| DomainError::ItemNotFound {
                batch_id: self.id.clone(),
                order_id: order_id.to_string(),
            })?;

        self.items.remove(position);
        self.total_items = self.items.len();
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Update an item's status. Allowed in any batch status: a damaged
    /// batch freezes membership, not per-item bookkeeping.
    pub fn update_item_status(&mut self, order_id: &str, status: &str) -> DomainResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.order_id == order_id)
            .ok_or_else(|| DomainError::ItemNotFound {
                batch_id: self.id.clone(),
                order_id: order_id.to_string(),
            })?;

        item.status = status.to_string();
        if PROCESSED_ITEM_STATUSES.contains(&status) {
            item.processed_at = Some(chrono::Utc::now());
        }
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    pub fn start_processing(&mut self) -> DomainResult<()> {
        self.transition(BatchStatus::Processing)
    }

    pub fn complete(&mut self) -> DomainResult<()> {
        self.transition(BatchStatus::Completed)?;
        self.processed_at = Some(chrono::Utc::now());
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        self.transition(BatchStatus::Cancelled)
    }

    pub fn mark_damaged(&mut self) -> DomainResult<()> {
        self.transition(BatchStatus::Damaged)
    }

    /// The batch state machine:
    ///
    /// ```text
    /// pending    -> processing | cancelled | damaged
    /// processing -> completed | cancelled | damaged
    /// completed  -> damaged
    /// cancelled  -> damaged
    /// damaged    -> (terminal)
    /// ```
    fn transition(&mut self, to: BatchStatus) -> DomainResult<()> {
        let allowed = match (self.status, to) {
            (BatchStatus::Pending, BatchStatus::Processing) => true,
            (BatchStatus::Pending, BatchStatus::Cancelled) => true,
            (BatchStatus::Processing, BatchStatus::Completed) => true,
            (BatchStatus::Processing, BatchStatus::Cancelled) => true,
            (_, BatchStatus::Damaged) => self.status != BatchStatus::Damaged,
            _ => false,
        };

        if !allowed {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }

        self.status = to;
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    pub fn item(&self, order_id: &str) -> Option<&BatchItem> {
        self.items.iter().find(|i| i.order_id == order_id)
    }

    pub fn has_order(&self, order_id: &str) -> bool {
        self.item(order_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when an empty batch should be retained rather than deleted.
    pub fn retain_when_empty(&self) -> bool {
        self.items_frozen()
    }
}

/// Batch event types (closed set).
pub mod batch_event_type {
    pub const CREATED: &str = "batch.created";
    pub const ITEM_ADDED: &str = "batch.item_added";
    pub const ITEM_REMOVED: &str = "batch.item_removed";
    pub const ITEM_UPDATED: &str = "batch.item_updated";
    pub const PROCESSING_STARTED: &str = "batch.processing_started";
    pub const COMPLETED: &str = "batch.completed";
    pub const CANCELLED: &str = "batch.cancelled";
    pub const MARKED_DAMAGED: &str = "batch.marked_damaged";
}

/// Lifecycle event published after a successful Batch mutation, keyed by
/// `batch_id` on the log broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEvent {
    pub event_type: String,
    pub batch_id: String,
    pub product_id: String,
    pub batch: Batch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_details: Option<BatchItem>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl BatchEvent {
    fn batch_scoped(event_type: &str, batch: &Batch) -> Self {
        Self {
            event_type: event_type.to_string(),
            batch_id: batch.id.clone(),
            product_id: batch.product_id.clone(),
            batch: batch.clone(),
            order_id: None,
            item_details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    fn item_scoped(event_type: &str, batch: &Batch, order_id: &str) -> Self {
        Self {
            order_id: Some(order_id.to_string()),
            item_details: batch.item(order_id).cloned(),
            ..Self::batch_scoped(event_type, batch)
        }
    }

    pub fn created(batch: &Batch) -> Self {
        Self::batch_scoped(batch_event_type::CREATED, batch)
    }

    pub fn item_added(batch: &Batch, order_id: &str) -> Self {
        Self::item_scoped(batch_event_type::ITEM_ADDED, batch, order_id)
    }

    pub fn item_removed(batch: &Batch, order_id: &str) -> Self {
        Self::item_scoped(batch_event_type::ITEM_REMOVED, batch, order_id)
    }

    pub fn item_updated(batch: &Batch, order_id: &str) -> Self {
        Self::item_scoped(batch_event_type::ITEM_UPDATED, batch, order_id)
    }

    pub fn processing_started(batch: &Batch) -> Self {
        Self::batch_scoped(batch_event_type::PROCESSING_STARTED, batch)
    }

    pub fn completed(batch: &Batch) -> Self {
        Self::batch_scoped(batch_event_type::COMPLETED, batch)
    }

    pub fn cancelled(batch: &Batch) -> Self {
        Self::batch_scoped(batch_event_type::CANCELLED, batch)
    }

    pub fn marked_damaged(batch: &Batch) -> Self {
        Self::batch_scoped(batch_event_type::MARKED_DAMAGED, batch)
    }
}
