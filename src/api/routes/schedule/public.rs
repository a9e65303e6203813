//! Public types for the schedule API
//!
//! The request body is the raw form field map and the response is the
//! outcome tag the status line renders, so both live with the orchestrator
//! and are re-exported here.

pub use crate::scheduling::orchestrator::{FormValues, OperationOutcome};
