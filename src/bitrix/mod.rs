pub mod client;
pub mod methods;

pub use client::{Bridge, RestBridge};
