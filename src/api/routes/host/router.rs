//! Router for the host session API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, extract::State};

use super::public;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

/// The form polls this on load to learn the acting user and enable its
/// submit control. Resolution goes through `user.current` once and is
/// cached for the lifetime of the process.
async fn host_handler(
    State(state): State<SharedState>,
) -> Result<Json<public::HostStatus>, crate::api::public::ApiError> {
    let orchestrator = { state.read().unwrap().orchestrator.clone() };
    let user_id = orchestrator.connect().await?;
    Ok(Json(public::HostStatus { user_id }))
}

/// Create the host router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::get(host_handler))
}
