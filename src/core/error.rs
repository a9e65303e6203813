use thiserror::Error;

/// Everything that can stop a submission. All of these are recoverable by
/// fixing the input or re-submitting; none abort the process.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Bad or missing form input, caught before any remote call.
    #[error("{0}")]
    Validation(String),

    /// The acting user has not been resolved from the host session yet.
    #[error("host session is not ready; the acting user is unknown")]
    HostNotReady,

    /// A submission is already running; the trigger should be disabled
    /// until it finishes.
    #[error("a submission is already in flight")]
    Busy,

    /// The portal answered with its error-as-value envelope. Carries the
    /// upstream message verbatim.
    #[error("{method} failed: {message}")]
    RemoteCall { method: String, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
