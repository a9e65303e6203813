pub mod config;
pub mod error;
pub use config::{ActivityKind, AppConfig, FormVariant, TimeInputMode, TimeWireFormat};
pub use error::ScheduleError;
