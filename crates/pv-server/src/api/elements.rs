//! Element reservation endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::ApiError;
use super::extract::{CurrentUser, JsonBody, QueryParams};
use super::routes::AppState;
use crate::reservations::Snapshot;

#[derive(Debug, Deserialize)]
pub struct ElementQuery {
    pub mid: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HolderRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementsResponse {
    pub reserved_elements: BTreeMap<String, Option<String>>,
}

impl From<Snapshot> for ElementsResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            reserved_elements: (*snapshot).clone(),
        }
    }
}

/// `GET /elements`
pub async fn list(State(state): State<AppState>) -> Result<Json<ElementsResponse>, ApiError> {
    let snapshot = state.reservations.list_reservations().await?;
    Ok(Json(snapshot.into()))
}

/// `POST /elements?mid=ID`
#[instrument(skip_all, fields(mid = %query.mid))]
pub async fn reserve(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    QueryParams(query): QueryParams<ElementQuery>,
    JsonBody(body): JsonBody<HolderRequest>,
) -> Result<Json<ElementsResponse>, ApiError> {
    let snapshot = state
        .reservations
        .reserve(&query.mid, body.name.as_deref(), &caller)
        .await?;
    Ok(Json(snapshot.into()))
}

/// `PATCH /elements?mid=ID`
#[instrument(skip_all, fields(mid = %query.mid))]
pub async fn modify(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    QueryParams(query): QueryParams<ElementQuery>,
    JsonBody(body): JsonBody<HolderRequest>,
) -> Result<Json<ElementsResponse>, ApiError> {
    let snapshot = state
        .reservations
        .modify(&query.mid, body.name.as_deref(), &caller)
        .await?;
    Ok(Json(snapshot.into()))
}

/// `DELETE /elements?mid=ID`
#[instrument(skip_all, fields(mid = %query.mid))]
pub async fn release(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    QueryParams(query): QueryParams<ElementQuery>,
) -> Result<Json<ElementsResponse>, ApiError> {
    let snapshot = state.reservations.release(&query.mid, &caller).await?;
    Ok(Json(snapshot.into()))
}
