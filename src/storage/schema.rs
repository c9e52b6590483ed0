//! SQLite schema for ride persistence.

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Schema version bookkeeping table.
pub const SCHEMA_VERSION_TABLE: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
";

/// Initial schema.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rides (
    id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    ended_at TEXT NOT NULL,
    route_name TEXT,
    distance_m REAL NOT NULL,
    duration_s REAL NOT NULL,
    avg_power_w REAL NOT NULL,
    avg_cadence_rpm REAL NOT NULL,
    avg_speed_kmh REAL NOT NULL,
    point_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ride_points (
    ride_id TEXT NOT NULL REFERENCES rides(id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    power_w REAL NOT NULL,
    cadence_rpm REAL NOT NULL,
    speed_kmh REAL NOT NULL,
    latitude REAL,
    longitude REAL,
    elevation REAL,
    distance_m REAL NOT NULL,
    gradient_percent REAL NOT NULL,
    gear TEXT NOT NULL,
    PRIMARY KEY (ride_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_rides_started_at ON rides(started_at);
";
