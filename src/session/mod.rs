//! Ride session orchestration.
//!
//! One background worker per active session drains trainer data, shift
//! events and control commands through a single `select!` loop. All
//! simulation and logging state lives on this worker; nothing here is
//! shared across tasks.

use crate::recording::{Ride, RideLog, RidePoint, RideSummary};
use crate::route::Route;
use crate::sim::engine::SimulationEngine;
use crate::sim::Mode;
use crate::storage::{RideStore, StoreError};
use crate::trainer::{ShiftEvent, TrainerData, TrainerError, TrainerLink};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

/// How often the loop logs a status snapshot.
const STATUS_PERIOD: Duration = Duration::from_secs(10);

/// Control commands accepted by a running session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    /// Suspend distance integration and point recording
    Pause,
    /// Resume from a pause
    Resume,
    /// Switch simulation mode
    SetMode(Mode),
    /// Set the ERG target power
    SetTargetPower(u16),
    /// Set the FREE-mode base resistance
    SetManualResistance(f64),
    /// Nudge the FREE-mode base resistance
    AdjustManualResistance(f64),
    /// Virtual gear shift
    Shift(ShiftEvent),
    /// Finish the session cooperatively
    Stop,
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the trainer link
    Connecting,
    /// Processing trainer data
    Active,
    /// Ignoring data for recording purposes
    Paused,
    /// Draining and flushing
    Stopping,
    /// Done
    Finished,
}

/// Errors surfaced to the session's caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Trainer link failure
    #[error(transparent)]
    Trainer(#[from] TrainerError),

    /// Persistence failure while flushing the final ride
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A single ride session: engine, optional route, ride log and the
/// event-loop state driving them.
pub struct RideSession {
    engine: SimulationEngine,
    route: Option<Route>,
    log: RideLog,
    state: SessionState,
    distance_m: f64,
    paused: bool,
    last_update: Option<Instant>,
    power_sum: f64,
    cadence_sum: f64,
    speed_sum: f64,
    samples: u64,
    command_errors: u64,
}

impl RideSession {
    /// Create a session over an engine and an optional route.
    pub fn new(engine: SimulationEngine, route: Option<Route>) -> Self {
        let route_name = route.as_ref().map(|r| r.name().to_string());
        Self {
            engine,
            route,
            log: RideLog::new(route_name),
            state: SessionState::Connecting,
            distance_m: 0.0,
            paused: false,
            last_update: None,
            power_sum: 0.0,
            cadence_sum: 0.0,
            speed_sum: 0.0,
            samples: 0,
            command_errors: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connect the trainer and run the event loop until stopped.
    ///
    /// Returns the finished ride. When the session recorded at least one
    /// point and a store is present, the ride is flushed to it first; a
    /// store failure is surfaced to the caller.
    pub async fn run(
        mut self,
        trainer: &mut dyn TrainerLink,
        mut store: Option<&mut dyn RideStore>,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Result<Ride, SessionError> {
        self.state = SessionState::Connecting;
        trainer.connect().await?;

        let mut data = trainer.data_channel();
        let mut shifts = trainer.shift_channel();
        let mut status = interval(STATUS_PERIOD);

        self.state = SessionState::Active;
        tracing::info!("session active");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        None | Some(SessionCommand::Stop) => break,
                        Some(command) => self.apply_command(command),
                    }
                }
                sample = data.recv() => {
                    match sample {
                        None => {
                            tracing::info!("trainer data channel closed");
                            break;
                        }
                        Some(sample) => self.on_sample(sample, trainer),
                    }
                }
                Some(shift) = shifts.recv() => self.on_shift(shift),
                _ = status.tick() => self.log_status(),
            }
        }

        self.state = SessionState::Stopping;
        let recorded = self.log.len();
        let ride = self.finish();

        if recorded > 0 {
            if let Some(store) = store.as_mut() {
                store.save_ride(&ride)?;
            }
        } else {
            tracing::info!("no points recorded, nothing to save");
        }

        self.state = SessionState::Finished;
        tracing::info!(
            points = recorded,
            distance_m = format!("{:.0}", ride.summary.distance_m),
            "session finished"
        );
        Ok(ride)
    }

    /// Process one trainer sample: update the engine, integrate distance,
    /// record a point and dispatch the trainer command for the current
    /// mode.
    fn on_sample(&mut self, sample: TrainerData, trainer: &dyn TrainerLink) {
        let now = Instant::now();
        let dt = self
            .last_update
            .map(|previous| (now - previous).as_secs_f64())
            .unwrap_or(0.0);
        self.last_update = Some(now);

        let gradient = self
            .route
            .as_ref()
            .map(|route| route.gradient_at(self.distance_m))
            .unwrap_or(0.0);

        let state = self.engine.update(sample.cadence_rpm, sample.power_w, gradient);

        if !self.paused {
            self.distance_m += state.speed_kmh / 3.6 * dt;
            self.engine.tick(dt, state.speed_kmh);
            self.power_sum += state.power_w;
            self.cadence_sum += state.cadence_rpm;
            self.speed_sum += state.speed_kmh;
            self.samples += 1;
        }

        let (latitude, longitude, elevation) = match &self.route {
            Some(route) => {
                let (lat, lon) = route.position_at(self.distance_m);
                (Some(lat), Some(lon), Some(route.elevation_at(self.distance_m)))
            }
            None => (None, None, None),
        };

        // The log's own pause state gates actual recording
        self.log.record(RidePoint {
            timestamp: chrono::Utc::now(),
            power_w: state.power_w,
            cadence_rpm: state.cadence_rpm,
            speed_kmh: state.speed_kmh,
            latitude,
            longitude,
            elevation,
            distance_m: self.distance_m,
            gradient_percent: state.gradient_percent,
            gear: state.gear_label.clone(),
        });

        let dispatched = match state.mode {
            Mode::Erg => trainer.set_target_power(state.target_power),
            Mode::Sim | Mode::Free => trainer.set_resistance(state.resistance),
        };
        if let Err(e) = dispatched {
            self.command_errors += 1;
            tracing::warn!(error = %e, "trainer command dropped");
        }
    }

    fn on_shift(&mut self, shift: ShiftEvent) {
        match shift {
            ShiftEvent::Up => self.engine.shift_up(),
            ShiftEvent::Down => self.engine.shift_down(),
        }
    }

    fn apply_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Pause => {
                if !self.paused {
                    self.paused = true;
                    self.log.pause();
                    self.state = SessionState::Paused;
                    tracing::info!("session paused");
                }
            }
            SessionCommand::Resume => {
                if self.paused {
                    self.paused = false;
                    self.log.resume();
                    self.state = SessionState::Active;
                    tracing::info!("session resumed");
                }
            }
            SessionCommand::SetMode(mode) => self.engine.set_mode(mode),
            SessionCommand::SetTargetPower(watts) => self.engine.set_target_power(watts),
            SessionCommand::SetManualResistance(level) => {
                self.engine.set_manual_resistance(level)
            }
            SessionCommand::AdjustManualResistance(delta) => {
                self.engine.adjust_manual_resistance(delta)
            }
            SessionCommand::Shift(shift) => self.on_shift(shift),
            // Stop is consumed by the event loop before reaching here
            SessionCommand::Stop => {}
        }
    }

    fn log_status(&self) {
        tracing::info!(
            state = ?self.state,
            mode = %self.engine.mode(),
            distance_m = format!("{:.0}", self.distance_m),
            elapsed_s = format!("{:.0}", self.engine.elapsed_s()),
            points = self.log.len(),
            command_errors = self.command_errors,
            "session status"
        );
    }

    fn finish(&mut self) -> Ride {
        let summary = if self.samples > 0 {
            let n = self.samples as f64;
            RideSummary {
                avg_power_w: self.power_sum / n,
                avg_cadence_rpm: self.cadence_sum / n,
                avg_speed_kmh: self.speed_sum / n,
                distance_m: self.distance_m,
                duration_s: self.engine.elapsed_s(),
            }
        } else {
            RideSummary::default()
        };

        let log = std::mem::replace(&mut self.log, RideLog::new(None));
        log.finish(summary)
    }
}
