pub mod calendar;
pub mod health;
pub mod index;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index::handler))
        .route("/calendar.ics", get(calendar::handler))
        .route("/health", get(health::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
