//! Ride export to JSON.
//!
//! A finished ride can be dropped next to the database as a standalone
//! file for external analysis tools.

use crate::recording::types::Ride;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors during ride export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Ride could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Export file could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write a ride as pretty-printed JSON into `dir`.
///
/// Returns the path of the written file, named `ride-<id>.json`.
pub fn export_json(ride: &Ride, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("ride-{}.json", ride.id));
    let json = serde_json::to_string_pretty(ride)?;
    std::fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "ride exported");
    Ok(path)
}
