//! Ride recording: the in-memory log and the persistable ride types.

pub mod exporter;
pub mod log;
pub mod types;

pub use log::RideLog;
pub use types::{Ride, RidePoint, RideSummary};
