use crate::domain::ReadingLog;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use coldchain_domain::TemperatureRange;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub range: Arc<RwLock<TemperatureRange>>,
    pub reading_log: Arc<ReadingLog>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/temperature-limits", post(update_temperature_limits))
        .route("/events", get(list_events))
        .route("/events/latest", get(latest_event))
        .route("/events/count", get(event_count))
        .route("/events/stats", get(event_stats))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "damage-detector",
        "timestamp": chrono::Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
struct TemperatureLimitsRequest {
    min_temperature: f64,
    max_temperature: f64,
}

async fn update_temperature_limits(
    State(state): State<AppState>,
    Json(request): Json<TemperatureLimitsRequest>,
) -> Result<Json<TemperatureRange>, (StatusCode, Json<serde_json::Value>)> {
    let range = TemperatureRange::new(request.min_temperature, request.max_temperature)
        .map_err(|err| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
        })?;

    *state.range.write().await = range;
    info!(
        min_temperature = range.min_temperature,
        max_temperature = range.max_temperature,
        "temperature limits updated"
    );

    Ok(Json(range))
}

async fn list_events(State(state): State<AppState>) -> Json<serde_json::Value> {
    let events = state.reading_log.all().await;
    Json(json!({ "count": events.len(), "events": events }))
}

async fn latest_event(
    State(state): State<AppState>,
) -> Result<Json<coldchain_domain::SensorReading>, (StatusCode, Json<serde_json::Value>)> {
    state.reading_log.latest().await.map(Json).ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "No events available" })),
    ))
}

async fn event_count(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "count": state.reading_log.count().await }))
}

async fn event_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.reading_log.stats().await;
    Json(serde_json::to_value(stats).unwrap_or_else(|_| json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState {
            range: Arc::new(RwLock::new(TemperatureRange::new(10.0, 50.0).unwrap())),
            reading_log: Arc::new(ReadingLog::new(16)),
        }
    }

    #[tokio::test]
    async fn test_update_temperature_limits() {
        let state = test_state();
        let response = update_temperature_limits(
            State(state.clone()),
            Json(TemperatureLimitsRequest {
                min_temperature: 15.0,
                max_temperature: 25.0,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.0.min_temperature, 15.0);
        assert_eq!(state.range.read().await.min_temperature, 15.0);
    }

    #[tokio::test]
    async fn test_update_temperature_limits_rejects_inverted_range() {
        let state = test_state();
        let result = update_temperature_limits(
            State(state.clone()),
            Json(TemperatureLimitsRequest {
                min_temperature: 30.0,
                max_temperature: 20.0,
            }),
        )
        .await;

        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        // the live range is untouched
        assert_eq!(state.range.read().await.min_temperature, 10.0);
    }

    #[tokio::test]
    async fn test_latest_event_empty_is_404() {
        let result = latest_event(State(test_state())).await;
        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
