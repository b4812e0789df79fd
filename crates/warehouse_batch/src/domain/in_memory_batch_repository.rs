use async_trait::async_trait;
use coldchain_domain::{Batch, BatchRepository, BatchStatus, DomainResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory batch store shared between the consumer task and the HTTP
/// readers. Readers run in parallel, writers exclusive; every batch
/// crossing the boundary is a copy, so callers never alias the stored
/// items.
pub struct InMemoryBatchRepository {
    batches: RwLock<HashMap<String, Batch>>,
}

impl InMemoryBatchRepository {
    pub fn new() -> Self {
        Self {
            batches: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBatchRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn save(&self, batch: Batch) -> DomainResult<()> {
        self.batches.write().await.insert(batch.id.clone(), batch);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Batch>> {
        Ok(self.batches.read().await.get(id).cloned())
    }

    async fn find_by_product_id(&self, product_id: &str) -> DomainResult<Vec<Batch>> {
        Ok(self
            .batches
            .read()
            .await
            .values()
            .filter(|batch| batch.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn find_by_status(&self, status: BatchStatus) -> DomainResult<Vec<Batch>> {
        Ok(self
            .batches
            .read()
            .await
            .values()
            .filter(|batch| batch.status == status)
            .cloned()
            .collect())
    }

    async fn find_by_order_id(&self, order_id: &str) -> DomainResult<Option<Batch>> {
        Ok(self
            .batches
            .read()
            .await
            .values()
            .find(|batch| batch.has_order(order_id))
            .cloned())
    }

    async fn find_pending_for_product(&self, product_id: &str) -> DomainResult<Option<Batch>> {
        Ok(self
            .batches
            .read()
            .await
            .values()
            .find(|batch| batch.product_id == product_id && batch.status == BatchStatus::Pending)
            .cloned())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let mut batches = self.batches.write().await;
        batches
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| coldchain_domain::DomainError::BatchNotFound(id.to_string()))
    }

    async fn find_all(&self) -> DomainResult<Vec<Batch>> {
        let batches = self.batches.read().await;
        let mut all: Vec<Batch> = batches.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
