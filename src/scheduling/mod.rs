pub mod deal;
pub mod orchestrator;
pub mod time;

pub use orchestrator::{FormValues, MeetingRequest, OperationOutcome, Orchestrator};
pub use time::TimeWindow;
