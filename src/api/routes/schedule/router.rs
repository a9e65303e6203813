//! Router for the schedule API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, extract::State};

use super::public;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

/// One form submission. Failures come back as a regular outcome payload,
/// not an error status, because the form shows the message either way.
async fn schedule_handler(
    State(state): State<SharedState>,
    Json(values): Json<public::FormValues>,
) -> Json<public::OperationOutcome> {
    let orchestrator = { state.read().unwrap().orchestrator.clone() };
    let outcome = orchestrator.handle_submit(&values).await;
    Json(outcome)
}

/// Create the schedule router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::post(schedule_handler))
}
