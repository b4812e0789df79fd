use async_trait::async_trait;
use coldchain_domain::{DomainResult, Order, OrderRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory order store. Readers run in parallel, writers exclusive;
/// every value crossing the boundary is a copy, so callers never alias
/// internal state. A disk-backed repository implements the same trait.
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> DomainResult<()> {
        self.orders.write().await.insert(order.id.clone(), order);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn update(&self, order: Order) -> DomainResult<()> {
        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order.id) {
            return Err(coldchain_domain::DomainError::OrderNotFound(
                order.id.clone(),
            ));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let mut orders = self.orders.write().await;
        orders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| coldchain_domain::DomainError::OrderNotFound(id.to_string()))
    }
}
