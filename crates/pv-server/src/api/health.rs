//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};
use tracing::warn;

use super::error::ApiError;
use super::routes::AppState;

/// `GET /health` - 200 once the store answers a ping, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.store.ping().await.map_err(|e| {
        warn!(error = %e, "Health check failed");
        ApiError::Unavailable
    })?;
    Ok(Json(json!({ "status": "ok" })))
}
