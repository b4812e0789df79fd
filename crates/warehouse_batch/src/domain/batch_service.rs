use coldchain_domain::{
    Batch, BatchEvent, BatchEventPublisher, BatchRepository, BatchStatus, DomainError,
    DomainResult,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Owns the Batch aggregate: pending-batch selection, membership, and
/// the batch state machine. Every successful mutation emits a batch
/// event; publish failures are logged and never roll back the mutation.
pub struct BatchService {
    batch_repo: Arc<dyn BatchRepository>,
    event_publisher: Arc<dyn BatchEventPublisher>,
}

impl BatchService {
    pub fn new(
        batch_repo: Arc<dyn BatchRepository>,
        event_publisher: Arc<dyn BatchEventPublisher>,
    ) -> Self {
        Self {
            batch_repo,
            event_publisher,
        }
    }

    /// Add an order to the open batch for its product, creating the
    /// batch when none is pending. An order already present in the batch
    /// is updated in place.
    #[instrument(skip(self), fields(product_id = %product_id, order_id = %order_id))]
    pub async fn add_order_to_batch(
        &self,
        order_id: &str,
        product_id: &str,
        quantity: u32,
        status: &str,
    ) -> DomainResult<Batch> {
        let (mut batch, is_new) = match self.batch_repo.find_pending_for_product(product_id).await?
        {
            Some(batch) => {
                info!(batch_id = %batch.id, "found open batch for product");
                (batch, false)
            }
            None => {
                let batch_id = generate_batch_id(product_id);
                info!(batch_id = %batch_id, "creating new batch for product");
                (Batch::new(batch_id, product_id.to_string()), true)
            }
        };

        batch.add_item(order_id, product_id, quantity, status)?;
        self.batch_repo.save(batch.clone()).await?;

        if is_new {
            self.publish(BatchEvent::created(&batch)).await;
        }
        self.publish(BatchEvent::item_added(&batch, order_id)).await;

        Ok(batch)
    }

    /// Remove an order from its batch. An emptied batch is deleted
    /// unless it is in a terminal or damaged state, in which case the
    /// empty record is retained.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn remove_order_from_batch(&self, order_id: &str) -> DomainResult<()> {
        let mut batch = self
            .batch_repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotInAnyBatch(order_id.to_string()))?;

        batch.remove_item(order_id)?;

        if batch.is_empty() && !batch.retain_when_empty() {
            info!(batch_id = %batch.id, "batch is empty, deleting");
            self.batch_repo.delete(&batch.id).await?;
        } else {
            self.batch_repo.save(batch.clone()).await?;
        }

        self.publish(BatchEvent::item_removed(&batch, order_id))
            .await;
        Ok(())
    }

    /// Update the status of an order within its batch.
    #[instrument(skip(self), fields(order_id = %order_id, status = %status))]
    pub async fn update_order_status(&self, order_id: &str, status: &str) -> DomainResult<Batch> {
        let mut batch = self
            .batch_repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotInAnyBatch(order_id.to_string()))?;

        batch.update_item_status(order_id, status)?;
        self.batch_repo.save(batch.clone()).await?;

        self.publish(BatchEvent::item_updated(&batch, order_id))
            .await;
        Ok(batch)
    }

    pub async fn process_batch(&self, batch_id: &str) -> DomainResult<Batch> {
        self.transition_batch(batch_id, Batch::start_processing, BatchEvent::processing_started)
            .await
    }

    pub async fn complete_batch(&self, batch_id: &str) -> DomainResult<Batch> {
        self.transition_batch(batch_id, Batch::complete, BatchEvent::completed)
            .await
    }

    pub async fn cancel_batch(&self, batch_id: &str) -> DomainResult<Batch> {
        self.transition_batch(batch_id, Batch::cancel, BatchEvent::cancelled)
            .await
    }

    pub async fn mark_batch_damaged(&self, batch_id: &str) -> DomainResult<Batch> {
        self.transition_batch(batch_id, Batch::mark_damaged, BatchEvent::marked_damaged)
            .await
    }

    async fn transition_batch(
        &self,
        batch_id: &str,
        apply: fn(&mut Batch) -> DomainResult<()>,
        event: fn(&Batch) -> BatchEvent,
    ) -> DomainResult<Batch> {
        let mut batch = self
            .batch_repo
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| DomainError::BatchNotFound(batch_id.to_string()))?;

        apply(&mut batch)?;
        self.batch_repo.save(batch.clone()).await?;

        info!(batch_id = %batch.id, status = %batch.status, "batch transitioned");
        self.publish(event(&batch)).await;
        Ok(batch)
    }

    pub async fn get_batch(&self, batch_id: &str) -> DomainResult<Option<Batch>> {
        self.batch_repo.find_by_id(batch_id).await
    }

    pub async fn get_batch_by_order_id(&self, order_id: &str) -> DomainResult<Option<Batch>> {
        self.batch_repo.find_by_order_id(order_id).await
    }

    pub async fn get_batches_by_product(&self, product_id: &str) -> DomainResult<Vec<Batch>> {
        self.batch_repo.find_by_product_id(product_id).await
    }

    pub async fn get_batches_by_status(&self, status: BatchStatus) -> DomainResult<Vec<Batch>> {
        self.batch_repo.find_by_status(status).await
    }

    pub async fn get_all_batches(&self) -> DomainResult<Vec<Batch>> {
        self.batch_repo.find_all().await
    }

    /// Fire-and-log: the aggregate is already persisted when events go
    /// out, so a publish failure never unwinds the mutation.
    async fn publish(&self, event: BatchEvent) {
        if let Err(err) = self.event_publisher.publish_batch_event(&event).await {
            error!(
                event_type = %event.event_type,
                batch_id = %event.batch_id,
                error = %err,
                "failed to publish batch event"
            );
        }
    }
}

/// Batch ids embed the product and a UTC second-resolution timestamp.
fn generate_batch_id(product_id: &str) -> String {
    format!(
        "BATCH-{}-{}",
        product_id,
        chrono::Utc::now().format("%Y%m%d%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InMemoryBatchRepository;
    use coldchain_domain::{batch_event_type, MockBatchEventPublisher};
    use std::sync::Mutex;

    /// Publisher that records event types instead of talking to a broker.
    struct RecordingPublisher {
        events: Mutex<Vec<String>>,
    }

    impl RecordingPublisher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn event_types(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl BatchEventPublisher for RecordingPublisher {
        async fn publish_batch_event(&self, event: &BatchEvent) -> DomainResult<()> {
            self.events.lock().unwrap().push(event.event_type.clone());
            Ok(())
        }
    }

    fn service_with(
        publisher: Arc<dyn BatchEventPublisher>,
    ) -> (BatchService, Arc<InMemoryBatchRepository>) {
        let repo = Arc::new(InMemoryBatchRepository::new());
        (BatchService::new(repo.clone(), publisher), repo)
    }

    #[tokio::test]
    async fn test_add_creates_batch_then_reuses_it() {
        let publisher = RecordingPublisher::new();
        let (service, repo) = service_with(publisher.clone());

        let first = service
            .add_order_to_batch("order-1", "p1", 1, "allocated")
            .await
            .unwrap();
        let second = service
            .add_order_to_batch("order-2", "p1", 1, "allocated")
            .await
            .unwrap();

        // one open batch per product
        assert_eq!(first.id, second.id);
        assert_eq!(second.total_items, 2);
        assert!(first.id.starts_with("BATCH-p1-"));
        assert_eq!(
            repo.find_by_status(BatchStatus::Pending).await.unwrap().len(),
            1
        );
        assert_eq!(
            publisher.event_types(),
            vec![
                batch_event_type::CREATED,
                batch_event_type::ITEM_ADDED,
                batch_event_type::ITEM_ADDED,
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_last_order_deletes_batch() {
        let publisher = RecordingPublisher::new();
        let (service, repo) = service_with(publisher.clone());

        let batch = service
            .add_order_to_batch("order-1", "p1", 1, "allocated")
            .await
            .unwrap();
        service.remove_order_from_batch("order-1").await.unwrap();

        assert!(repo.find_by_id(&batch.id).await.unwrap().is_none());
        assert_eq!(
            service.get_batches_by_product("p1").await.unwrap().len(),
            0
        );
        assert!(publisher
            .event_types()
            .contains(&batch_event_type::ITEM_REMOVED.to_string()));
    }

    #[tokio::test]
    async fn test_remove_keeps_non_empty_batch() {
        let publisher = RecordingPublisher::new();
        let (service, repo) = service_with(publisher);

        let batch = service
            .add_order_to_batch("order-1", "p1", 1, "allocated")
            .await
            .unwrap();
        service
            .add_order_to_batch("order-2", "p1", 1, "allocated")
            .await
            .unwrap();
        service.remove_order_from_batch("order-1").await.unwrap();

        let stored = repo.find_by_id(&batch.id).await.unwrap().unwrap();
        assert_eq!(stored.total_items, 1);
        assert!(stored.has_order("order-2"));
    }

    #[tokio::test]
    async fn test_remove_unknown_order_fails() {
        let (service, _) = service_with(RecordingPublisher::new());
        assert!(matches!(
            service.remove_order_from_batch("ghost").await,
            Err(DomainError::OrderNotInAnyBatch(_))
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_transitions_emit_events() {
        let publisher = RecordingPublisher::new();
        let (service, _) = service_with(publisher.clone());

        let batch = service
            .add_order_to_batch("order-1", "p1", 1, "allocated")
            .await
            .unwrap();

        service.process_batch(&batch.id).await.unwrap();
        let completed = service.complete_batch(&batch.id).await.unwrap();
        assert_eq!(completed.status, BatchStatus::Completed);

        let events = publisher.event_types();
        assert!(events.contains(&batch_event_type::PROCESSING_STARTED.to_string()));
        assert!(events.contains(&batch_event_type::COMPLETED.to_string()));
    }

    #[tokio::test]
    async fn test_illegal_transition_surfaces_domain_error() {
        let (service, _) = service_with(RecordingPublisher::new());
        let batch = service
            .add_order_to_batch("order-1", "p1", 1, "allocated")
            .await
            .unwrap();

        assert!(matches!(
            service.complete_batch(&batch.id).await,
            Err(DomainError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            service.process_batch("ghost").await,
            Err(DomainError::BatchNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_unwind_mutation() {
        let mut publisher = MockBatchEventPublisher::new();
        publisher
            .expect_publish_batch_event()
            .returning(|_| {
                Err(DomainError::RepositoryError(anyhow::anyhow!(
                    "broker unavailable"
                )))
            });

        let repo = Arc::new(InMemoryBatchRepository::new());
        let service = BatchService::new(repo.clone(), Arc::new(publisher));

        let batch = service
            .add_order_to_batch("order-1", "p1", 1, "allocated")
            .await
            .unwrap();

        assert!(repo.find_by_id(&batch.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_emptied_damaged_batch_is_retained() {
        let (service, repo) = service_with(RecordingPublisher::new());
        let batch = service
            .add_order_to_batch("order-1", "p1", 1, "damage_major")
            .await
            .unwrap();
        service.mark_batch_damaged(&batch.id).await.unwrap();

        // items of a damaged batch cannot be removed; the record stays
        assert!(matches!(
            service.remove_order_from_batch("order-1").await,
            Err(DomainError::BatchFrozen { .. })
        ));
        assert!(repo.find_by_id(&batch.id).await.unwrap().is_some());
    }
}
