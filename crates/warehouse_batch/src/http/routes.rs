use crate::domain::BatchService;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use coldchain_domain::{Batch, BatchStatus, DomainError};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BatchService>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/batches", get(list_batches))
        .route("/api/v1/batches/product/:productId", get(batches_by_product))
        .route("/api/v1/batches/status/:status", get(batches_by_status))
        .route("/api/v1/batches/order/:orderId", get(batch_by_order))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "warehouse-batch",
        "timestamp": chrono::Utc::now(),
    }))
}

fn error_response(err: DomainError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

fn batch_list(batches: Vec<Batch>) -> Json<serde_json::Value> {
    Json(json!({ "count": batches.len(), "batches": batches }))
}

async fn list_batches(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let batches = state
        .service
        .get_all_batches()
        .await
        .map_err(error_response)?;
    Ok(batch_list(batches))
}

async fn batches_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let batches = state
        .service
        .get_batches_by_product(&product_id)
        .await
        .map_err(error_response)?;
    Ok(batch_list(batches))
}

async fn batches_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = BatchStatus::parse(&status).ok_or((
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": format!("unknown batch status: {status}") })),
    ))?;

    let batches = state
        .service
        .get_batches_by_status(status)
        .await
        .map_err(error_response)?;
    Ok(batch_list(batches))
}

async fn batch_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Batch>, ApiError> {
    let batch = state
        .service
        .get_batch_by_order_id(&order_id)
        .await
        .map_err(error_response)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no batch contains order {order_id}") })),
        ))?;

    Ok(Json(batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InMemoryBatchRepository;
    use coldchain_domain::{BatchEvent, BatchEventPublisher, DomainResult};

    struct NullPublisher;

    #[async_trait::async_trait]
    impl BatchEventPublisher for NullPublisher {
        async fn publish_batch_event(&self, _event: &BatchEvent) -> DomainResult<()> {
            Ok(())
        }
    }

    fn test_state() -> AppState {
        AppState {
            service: Arc::new(BatchService::new(
                Arc::new(InMemoryBatchRepository::new()),
                Arc::new(NullPublisher),
            )),
        }
    }

    #[tokio::test]
    async fn test_batches_by_status_rejects_unknown_status() {
        let result = batches_by_status(State(test_state()), Path("melted".to_string())).await;
        assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch_by_order_unknown_is_404() {
        let result = batch_by_order(State(test_state()), Path("ghost".to_string())).await;
        assert_eq!(result.unwrap_err().0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_and_filter_batches() {
        let state = test_state();
        state
            .service
            .add_order_to_batch("order-1", "p1", 1, "allocated")
            .await
            .unwrap();

        let Json(all) = list_batches(State(state.clone())).await.unwrap();
        assert_eq!(all["count"], 1);

        let Json(by_product) = batches_by_product(State(state.clone()), Path("p1".to_string()))
            .await
            .unwrap();
        assert_eq!(by_product["count"], 1);

        let Json(pending) = batches_by_status(State(state.clone()), Path("pending".to_string()))
            .await
            .unwrap();
        assert_eq!(pending["count"], 1);

        let Json(batch) = batch_by_order(State(state), Path("order-1".to_string()))
            .await
            .unwrap();
        assert!(batch.has_order("order-1"));
    }
}
