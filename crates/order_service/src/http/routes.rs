use crate::domain::OrderService;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use coldchain_domain::{DomainError, Order};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/orders", post(create_order).get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/status", put(update_order_status))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "order-service",
        "timestamp": chrono::Utc::now(),
    }))
}

fn error_response(err: DomainError) -> ApiError {
    let status = match err {
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    customer_id: String,
    product_id: String,
    quantity: u32,
    total_amount: f64,
}

async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    if request.customer_id.is_empty() || request.product_id.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "customer_id and product_id are required" })),
        ));
    }
    if request.quantity < 1 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "quantity must be at least 1" })),
        ));
    }
    if request.total_amount < 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "total_amount must not be negative" })),
        ));
    }

    let order = state
        .service
        .create_order(
            request.customer_id,
            request.product_id,
            request.quantity,
            request.total_amount,
        )
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let orders = state.service.list_orders().await.map_err(error_response)?;
    Ok(Json(json!({ "count": orders.len(), "orders": orders })))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .service
        .get_order(&id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(DomainError::OrderNotFound(id)))?;

    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    if request.status.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "status is required" })),
        ));
    }

    let order = state
        .service
        .update_order_status(&id, request.status)
        .await
        .map_err(error_response)?;

    Ok(Json(order))
}
