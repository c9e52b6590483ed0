//! End-to-end session loop tests with an in-memory trainer link.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use veloshift::recording::Ride;
use veloshift::route::{Route, RoutePoint};
use veloshift::session::{RideSession, SessionCommand};
use veloshift::sim::engine::{EngineSettings, SimulationEngine};
use veloshift::sim::gears::GearSet;
use veloshift::sim::Mode;
use veloshift::storage::{RideStore, StoreError};
use veloshift::trainer::{ShiftEvent, TrainerData, TrainerError, TrainerLink};

/// Commands the session dispatched to the trainer.
#[derive(Clone, Default)]
struct CommandRecorder {
    resistance: Arc<Mutex<Vec<f64>>>,
    target_power: Arc<Mutex<Vec<u16>>>,
}

/// Trainer link fed from test-owned channels.
struct ChannelTrainer {
    data_rx: Option<mpsc::Receiver<TrainerData>>,
    shift_rx: Option<mpsc::Receiver<ShiftEvent>>,
    recorder: CommandRecorder,
    connected: bool,
}

impl ChannelTrainer {
    fn new() -> (Self, mpsc::Sender<TrainerData>, mpsc::Sender<ShiftEvent>) {
        let (data_tx, data_rx) = mpsc::channel(32);
        let (shift_tx, shift_rx) = mpsc::channel(32);
        let trainer = Self {
            data_rx: Some(data_rx),
            shift_rx: Some(shift_rx),
            recorder: CommandRecorder::default(),
            connected: false,
        };
        (trainer, data_tx, shift_tx)
    }
}

#[async_trait]
impl TrainerLink for ChannelTrainer {
    async fn connect(&mut self) -> Result<(), TrainerError> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TrainerError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn data_channel(&mut self) -> mpsc::Receiver<TrainerData> {
        self.data_rx.take().unwrap()
    }

    fn shift_channel(&mut self) -> mpsc::Receiver<ShiftEvent> {
        self.shift_rx.take().unwrap()
    }

    fn set_resistance(&self, level: f64) -> Result<(), TrainerError> {
        self.recorder.resistance.lock().unwrap().push(level);
        Ok(())
    }

    fn set_target_power(&self, watts: u16) -> Result<(), TrainerError> {
        self.recorder.target_power.lock().unwrap().push(watts);
        Ok(())
    }
}

/// Store that keeps saved rides in memory.
#[derive(Clone, Default)]
struct MemoryStore {
    rides: Arc<Mutex<Vec<Ride>>>,
}

impl RideStore for MemoryStore {
    fn save_ride(&mut self, ride: &Ride) -> Result<(), StoreError> {
        self.rides.lock().unwrap().push(ride.clone());
        Ok(())
    }
}

/// 50x17 engine with default settings (wheel 2.1 m, 75 kg, scaling 0.2).
fn engine_50_17() -> SimulationEngine {
    let mut gears = GearSet::new(vec![50], vec![11, 13, 15, 17, 19, 21]);
    gears.set_rear(3);
    SimulationEngine::new(gears, EngineSettings::default())
}

fn sample() -> TrainerData {
    TrainerData {
        cadence_rpm: 90.0,
        power_w: 200.0,
    }
}

const STEP: Duration = Duration::from_millis(10);

#[tokio::test]
async fn pause_gates_points_and_averages() {
    let (mut trainer, data_tx, _shift_tx) = ChannelTrainer::new();
    let recorder = trainer.recorder.clone();
    let mut store = MemoryStore::default();
    let saved = store.rides.clone();
    let (commands, command_rx) = mpsc::channel(8);

    let driver = tokio::spawn(async move {
        for _ in 0..3 {
            data_tx.send(sample()).await.unwrap();
            sleep(STEP).await;
        }
        commands.send(SessionCommand::Pause).await.unwrap();
        sleep(STEP).await;
        for _ in 0..3 {
            data_tx.send(sample()).await.unwrap();
            sleep(STEP).await;
        }
        commands.send(SessionCommand::Resume).await.unwrap();
        sleep(STEP).await;
        for _ in 0..2 {
            data_tx.send(sample()).await.unwrap();
            sleep(STEP).await;
        }
        commands.send(SessionCommand::Stop).await.unwrap();
    });

    let session = RideSession::new(engine_50_17(), None);
    let ride = session
        .run(&mut trainer, Some(&mut store), command_rx)
        .await
        .unwrap();
    driver.await.unwrap();

    // Paused samples are excluded from the log and the averages
    assert_eq!(ride.points.len(), 5);
    assert!((ride.summary.avg_power_w - 200.0).abs() < 1e-9);
    assert!((ride.summary.avg_cadence_rpm - 90.0).abs() < 1e-9);
    assert!((ride.summary.avg_speed_kmh - 33.34).abs() < 0.3);

    // Every sample still dispatched a trainer command, paused or not
    assert_eq!(recorder.resistance.lock().unwrap().len(), 8);

    // End-to-end calibration: flat road, 50x17, defaults
    for resistance in recorder.resistance.lock().unwrap().iter() {
        assert!(*resistance > 0.0 && *resistance < 50.0, "resistance {resistance}");
    }

    // The finished ride was flushed to the store
    assert_eq!(saved.lock().unwrap().len(), 1);
    assert_eq!(saved.lock().unwrap()[0].id, ride.id);
}

#[tokio::test]
async fn shift_events_change_recorded_gear() {
    let (mut trainer, data_tx, shift_tx) = ChannelTrainer::new();
    let (commands, command_rx) = mpsc::channel(8);

    let driver = tokio::spawn(async move {
        data_tx.send(sample()).await.unwrap();
        sleep(STEP).await;
        shift_tx.send(ShiftEvent::Up).await.unwrap();
        sleep(STEP).await;
        data_tx.send(sample()).await.unwrap();
        sleep(STEP).await;
        shift_tx.send(ShiftEvent::Down).await.unwrap();
        shift_tx.send(ShiftEvent::Down).await.unwrap();
        sleep(STEP).await;
        data_tx.send(sample()).await.unwrap();
        sleep(STEP).await;
        commands.send(SessionCommand::Stop).await.unwrap();
    });

    let session = RideSession::new(engine_50_17(), None);
    let ride = session.run(&mut trainer, None, command_rx).await.unwrap();
    driver.await.unwrap();

    let gears: Vec<&str> = ride.points.iter().map(|p| p.gear.as_str()).collect();
    assert_eq!(gears, vec!["50x17", "50x15", "50x19"]);
}

#[tokio::test]
async fn erg_mode_dispatches_target_power() {
    let (mut trainer, data_tx, _shift_tx) = ChannelTrainer::new();
    let recorder = trainer.recorder.clone();
    let (commands, command_rx) = mpsc::channel(8);

    let driver = tokio::spawn(async move {
        commands.send(SessionCommand::SetMode(Mode::Erg)).await.unwrap();
        commands.send(SessionCommand::SetTargetPower(250)).await.unwrap();
        sleep(STEP).await;
        for _ in 0..2 {
            data_tx.send(sample()).await.unwrap();
            sleep(STEP).await;
        }
        commands.send(SessionCommand::Stop).await.unwrap();
    });

    let session = RideSession::new(engine_50_17(), None);
    session.run(&mut trainer, None, command_rx).await.unwrap();
    driver.await.unwrap();

    assert_eq!(*recorder.target_power.lock().unwrap(), vec![250, 250]);
    assert!(recorder.resistance.lock().unwrap().is_empty());
}

#[tokio::test]
async fn route_positions_attached_to_points() {
    let route = Route::new(
        "Test Route",
        vec![
            RoutePoint {
                latitude: 45.5,
                longitude: -122.5,
                elevation: 100.0,
                distance: 0.0,
            },
            RoutePoint {
                latitude: 45.6,
                longitude: -122.4,
                elevation: 150.0,
                distance: 5000.0,
            },
        ],
    );

    let (mut trainer, data_tx, _shift_tx) = ChannelTrainer::new();
    let (commands, command_rx) = mpsc::channel(8);

    let driver = tokio::spawn(async move {
        for _ in 0..3 {
            data_tx.send(sample()).await.unwrap();
            sleep(STEP).await;
        }
        commands.send(SessionCommand::Stop).await.unwrap();
    });

    let session = RideSession::new(engine_50_17(), Some(route));
    let ride = session.run(&mut trainer, None, command_rx).await.unwrap();
    driver.await.unwrap();

    assert_eq!(ride.route_name.as_deref(), Some("Test Route"));
    assert_eq!(ride.points.len(), 3);
    for point in &ride.points {
        assert!(point.latitude.is_some());
        assert!(point.longitude.is_some());
        assert!(point.elevation.is_some());
        // Riding uphill on a 1% route
        assert!(point.gradient_percent > 0.0);
    }
    // Distance advances between samples
    assert!(ride.points[2].distance_m > ride.points[0].distance_m);
}

#[tokio::test]
async fn empty_session_saves_nothing() {
    let (mut trainer, _data_tx, _shift_tx) = ChannelTrainer::new();
    let mut store = MemoryStore::default();
    let saved = store.rides.clone();
    let (commands, command_rx) = mpsc::channel(8);

    let driver = tokio::spawn(async move {
        sleep(STEP).await;
        commands.send(SessionCommand::Stop).await.unwrap();
    });

    let session = RideSession::new(engine_50_17(), None);
    let ride = session
        .run(&mut trainer, Some(&mut store), command_rx)
        .await
        .unwrap();
    driver.await.unwrap();

    assert!(ride.points.is_empty());
    assert_eq!(ride.summary.avg_power_w, 0.0);
    assert!(saved.lock().unwrap().is_empty());
}
