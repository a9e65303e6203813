//! API routes module

pub mod host;
pub mod schedule;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Submission routes
        .nest("/schedule", schedule::router())
        // Host session routes
        .nest("/host", host::router())
}
