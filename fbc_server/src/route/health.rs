use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    last_update: Option<DateTime<Utc>>,
    has_cached_data: bool,
}

/// Report the cache state without triggering a refresh.
pub async fn handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.cache.snapshot().await;
    Json(HealthResponse {
        status: "ok",
        last_update: snapshot.last_update,
        has_cached_data: snapshot.ics.is_some(),
    })
}
