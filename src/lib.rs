//! Scheduling core for a Bitrix24-embedded "schedule a meeting" form.
//!
//! Normalizes user-entered date/time into the portal's wire formats,
//! resolves the target deal from an id, a pasted card URL, or placement
//! context, and dispatches the calendar-event and deal-activity creation
//! calls in order through a thin REST bridge.

pub mod api;
pub mod bitrix;
pub mod cli;
pub mod core;
pub mod scheduling;
