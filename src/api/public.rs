//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::core::ScheduleError;

// Errors

pub struct ApiError(anyhow::Error);

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Always log the error
        tracing::error!("{}", self.0);

        // An unreachable or unready portal is a 503: the client retries
        // later. Anything else is a plain 500.
        let status = match self.0.downcast_ref::<ScheduleError>() {
            Some(
                ScheduleError::HostNotReady
                | ScheduleError::RemoteCall { .. }
                | ScheduleError::Transport(_),
            ) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, format!("Something went wrong: {}", self.0)).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod host {
    pub use crate::api::routes::host::public::*;
}

pub mod schedule {
    pub use crate::api::routes::schedule::public::*;
}
