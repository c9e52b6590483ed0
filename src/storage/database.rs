//! Ride persistence using rusqlite.

use crate::recording::{Ride, RidePoint, RideSummary};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use crate::storage::{RideStore, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::Path;
use uuid::Uuid;

/// Summary row for the ride history listing.
#[derive(Debug, Clone)]
pub struct RideRecord {
    /// Ride identifier
    pub id: Uuid,
    /// Ride start timestamp
    pub started_at: DateTime<Utc>,
    /// Route ridden, if any
    pub route_name: Option<String>,
    /// Summary averages
    pub summary: RideSummary,
    /// Number of recorded points
    pub point_count: usize,
}

/// SQLite wrapper for ride history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let conn =
            Connection::open(path).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        if self.schema_version()? < CURRENT_VERSION {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
            tracing::info!("database migrated to version {}", CURRENT_VERSION);
        }
        Ok(())
    }

    fn schema_version(&self) -> Result<i32, StoreError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );
        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(StoreError::QueryFailed(e.to_string())),
        }
    }

    /// List saved rides, newest first.
    pub fn list_rides(&self, limit: usize) -> Result<Vec<RideRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, started_at, route_name, distance_m, duration_s,
                        avg_power_w, avg_cadence_rpm, avg_speed_kmh, point_count
                 FROM rides ORDER BY started_at DESC LIMIT ?",
            )
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([limit], |row| {
                let id: String = row.get(0)?;
                let started_at: String = row.get(1)?;
                Ok((
                    id,
                    started_at,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, started_at, route_name, distance_m, duration_s, avg_power_w,
                avg_cadence_rpm, avg_speed_kmh, point_count) =
                row.map_err(|e| StoreError::QueryFailed(e.to_string()))?;

            let id = Uuid::parse_str(&id)
                .map_err(|e| StoreError::Corrupt(format!("bad ride id: {e}")))?;
            let started_at = DateTime::parse_from_rfc3339(&started_at)
                .map_err(|e| StoreError::Corrupt(format!("bad timestamp: {e}")))?
                .with_timezone(&Utc);

            records.push(RideRecord {
                id,
                started_at,
                route_name,
                summary: RideSummary {
                    avg_power_w,
                    avg_cadence_rpm,
                    avg_speed_kmh,
                    distance_m,
                    duration_s,
                },
                point_count: point_count as usize,
            });
        }
        Ok(records)
    }

    fn insert_points(
        tx: &rusqlite::Transaction<'_>,
        ride_id: &Uuid,
        points: &[RidePoint],
    ) -> Result<(), StoreError> {
        let mut stmt = tx
            .prepare(
                "INSERT INTO ride_points (ride_id, seq, timestamp, power_w, cadence_rpm,
                 speed_kmh, latitude, longitude, elevation, distance_m, gradient_percent, gear)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        for (seq, point) in points.iter().enumerate() {
            stmt.execute(params![
                ride_id.to_string(),
                seq as i64,
                point.timestamp.to_rfc3339(),
                point.power_w,
                point.cadence_rpm,
                point.speed_kmh,
                point.latitude,
                point.longitude,
                point.elevation,
                point.distance_m,
                point.gradient_percent,
                point.gear,
            ])
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl RideStore for Database {
    fn save_ride(&mut self, ride: &Ride) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        tx.execute(
            "INSERT INTO rides (id, started_at, ended_at, route_name, distance_m, duration_s,
             avg_power_w, avg_cadence_rpm, avg_speed_kmh, point_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                ride.id.to_string(),
                ride.started_at.to_rfc3339(),
                ride.ended_at.to_rfc3339(),
                ride.route_name,
                ride.summary.distance_m,
                ride.summary.duration_s,
                ride.summary.avg_power_w,
                ride.summary.avg_cadence_rpm,
                ride.summary.avg_speed_kmh,
                ride.points.len() as i64,
            ],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Self::insert_points(&tx, &ride.id, &ride.points)?;

        tx.commit()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        tracing::info!(ride_id = %ride.id, points = ride.points.len(), "ride saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_ride(points: usize) -> Ride {
        let now = Utc::now();
        Ride {
            id: Uuid::new_v4(),
            started_at: now,
            ended_at: now,
            route_name: Some("Col du Test".to_string()),
            summary: RideSummary {
                avg_power_w: 210.0,
                avg_cadence_rpm: 88.0,
                avg_speed_kmh: 32.5,
                distance_m: 15_000.0,
                duration_s: 1800.0,
            },
            points: (0..points)
                .map(|i| RidePoint {
                    timestamp: now,
                    power_w: 200.0 + i as f64,
                    cadence_rpm: 90.0,
                    speed_kmh: 33.0,
                    latitude: Some(45.5),
                    longitude: Some(-122.5),
                    elevation: Some(120.0),
                    distance_m: i as f64 * 9.2,
                    gradient_percent: 1.5,
                    gear: "50x17".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_save_and_list_round_trip() {
        let mut db = Database::open_in_memory().unwrap();
        let ride = sample_ride(3);
        db.save_ride(&ride).unwrap();

        let records = db.list_rides(10).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, ride.id);
        assert_eq!(record.route_name.as_deref(), Some("Col du Test"));
        assert_eq!(record.point_count, 3);
        assert!((record.summary.avg_power_w - 210.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rides.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.save_ride(&sample_ride(1)).unwrap();
        }
        // Reopen and confirm the ride survived
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_rides(10).unwrap().len(), 1);
    }
}
