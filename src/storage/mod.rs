//! Configuration loading and ride persistence.

pub mod config;
pub mod database;
pub mod schema;

use crate::recording::Ride;
use thiserror::Error;

pub use config::AppConfig;
pub use database::Database;

/// Errors from the persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not open the database
    #[error("failed to open database: {0}")]
    ConnectionFailed(String),

    /// Schema creation or migration failed
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// A query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored data could not be decoded
    #[error("corrupt ride data: {0}")]
    Corrupt(String),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(String),
}

/// Where finished rides go.
///
/// The session loop flushes through this seam; the SQLite [`Database`] is
/// the production implementation.
pub trait RideStore: Send {
    /// Persist a finished ride and its points.
    fn save_ride(&mut self, ride: &Ride) -> Result<(), StoreError>;
}
