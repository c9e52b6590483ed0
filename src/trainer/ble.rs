//! BLE/FTMS trainer link built on btleplug.
//!
//! Scans for a peripheral advertising the FTMS service, subscribes to
//! Indoor Bike Data and drives the Control Point. Outbound commands go
//! through a bounded queue drained by a writer task, so a slow trainer
//! never stalls the session loop.

use crate::trainer::ftms::{
    build_request_control, build_set_target_power, build_set_target_resistance,
    build_start_training, parse_indoor_bike_data, FTMS_CONTROL_POINT_UUID, FTMS_SERVICE_UUID,
    INDOOR_BIKE_DATA_UUID,
};
use crate::trainer::{ShiftEvent, TrainerData, TrainerError, TrainerLink};
use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default depth of the outbound command queue.
const DEFAULT_COMMAND_QUEUE_DEPTH: usize = 8;

/// Depth of the data and shift channels.
const EVENT_CHANNEL_DEPTH: usize = 32;

/// How long to scan before picking a peripheral.
const SCAN_WINDOW: Duration = Duration::from_secs(5);

/// Outbound control point commands.
#[derive(Debug, Clone, Copy)]
enum TrainerCommand {
    Resistance(f64),
    TargetPower(u16),
}

/// BLE smart trainer speaking FTMS.
pub struct FtmsTrainer {
    device_name: Option<String>,
    peripheral: Option<Peripheral>,
    data_tx: mpsc::Sender<TrainerData>,
    data_rx: Option<mpsc::Receiver<TrainerData>>,
    shift_tx: mpsc::Sender<ShiftEvent>,
    shift_rx: Option<mpsc::Receiver<ShiftEvent>>,
    cmd_tx: mpsc::Sender<TrainerCommand>,
    cmd_rx: Option<mpsc::Receiver<TrainerCommand>>,
    connected: Arc<AtomicBool>,
}

impl FtmsTrainer {
    /// Create a link, optionally filtering discovery by device name.
    pub fn new(device_name: Option<String>, command_queue_depth: usize) -> Self {
        let depth = if command_queue_depth == 0 {
            DEFAULT_COMMAND_QUEUE_DEPTH
        } else {
            command_queue_depth
        };
        let (data_tx, data_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let (shift_tx, shift_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let (cmd_tx, cmd_rx) = mpsc::channel(depth);

        Self {
            device_name,
            peripheral: None,
            data_tx,
            data_rx: Some(data_rx),
            shift_tx,
            shift_rx: Some(shift_rx),
            cmd_tx,
            cmd_rx: Some(cmd_rx),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sender for injecting shift events into the link.
    ///
    /// Trainers with shift buttons would feed this from their own
    /// notifications; the CLI wires it to the keyboard.
    pub fn shift_sender(&self) -> mpsc::Sender<ShiftEvent> {
        self.shift_tx.clone()
    }

    /// Pick the first scanned peripheral advertising FTMS, honoring the
    /// configured name filter.
    async fn find_trainer(&self, adapter: &Adapter) -> Result<Peripheral, TrainerError> {
        let peripherals = adapter
            .peripherals()
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?;

        for peripheral in peripherals {
            let Ok(Some(properties)) = peripheral.properties().await else {
                continue;
            };
            if !properties.services.contains(&FTMS_SERVICE_UUID) {
                continue;
            }
            let name = properties.local_name.unwrap_or_default();
            if let Some(filter) = &self.device_name {
                if !name.contains(filter.as_str()) {
                    continue;
                }
            }
            tracing::info!(%name, "found FTMS trainer");
            return Ok(peripheral);
        }

        let filter = self
            .device_name
            .as_ref()
            .map(|n| format!(" matching \"{n}\""))
            .unwrap_or_default();
        Err(TrainerError::DeviceNotFound(filter))
    }

    fn send_command(&self, command: TrainerCommand) -> Result<(), TrainerError> {
        if !self.is_connected() {
            return Err(TrainerError::NotConnected);
        }
        self.cmd_tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TrainerError::CommandQueueFull,
            mpsc::error::TrySendError::Closed(_) => TrainerError::NotConnected,
        })
    }
}

#[async_trait]
impl TrainerLink for FtmsTrainer {
    async fn connect(&mut self) -> Result<(), TrainerError> {
        let manager = Manager::new()
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(TrainerError::AdapterNotFound)?;

        tracing::info!("scanning for FTMS trainers");
        adapter
            .start_scan(ScanFilter {
                services: vec![FTMS_SERVICE_UUID],
            })
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?;
        tokio::time::sleep(SCAN_WINDOW).await;
        let peripheral = self.find_trainer(&adapter).await?;
        let _ = adapter.stop_scan().await;

        peripheral
            .connect()
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?;

        let characteristics = peripheral.characteristics();
        let bike_data = characteristics
            .iter()
            .find(|c| c.uuid == INDOOR_BIKE_DATA_UUID)
            .cloned()
            .ok_or_else(|| TrainerError::CharacteristicMissing("Indoor Bike Data".to_string()))?;
        let control_point = characteristics
            .iter()
            .find(|c| c.uuid == FTMS_CONTROL_POINT_UUID)
            .cloned()
            .ok_or_else(|| TrainerError::CharacteristicMissing("Control Point".to_string()))?;

        peripheral
            .subscribe(&bike_data)
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?;

        for command in [build_request_control(), build_start_training()] {
            peripheral
                .write(&control_point, &command, WriteType::WithResponse)
                .await
                .map_err(|e| TrainerError::Ble(e.to_string()))?;
        }

        self.connected.store(true, Ordering::SeqCst);

        // Notification pump: Indoor Bike Data -> data channel
        let notifications = peripheral
            .notifications()
            .await
            .map_err(|e| TrainerError::Ble(e.to_string()))?;
        let data_tx = self.data_tx.clone();
        let connected = self.connected.clone();
        tokio::spawn(async move {
            let mut notifications = notifications;
            while let Some(notification) = notifications.next().await {
                if notification.uuid != INDOOR_BIKE_DATA_UUID {
                    continue;
                }
                let Some(parsed) = parse_indoor_bike_data(&notification.value) else {
                    tracing::debug!("unparseable Indoor Bike Data notification");
                    continue;
                };
                let sample = TrainerData {
                    cadence_rpm: parsed.cadence_rpm.unwrap_or(0.0),
                    power_w: parsed.power_w.map(f64::from).unwrap_or(0.0),
                };
                if data_tx.send(sample).await.is_err() {
                    break;
                }
            }
            connected.store(false, Ordering::SeqCst);
            tracing::info!("trainer notification stream ended");
        });

        // Command writer: drain the bounded queue into Control Point writes
        if let Some(mut cmd_rx) = self.cmd_rx.take() {
            let writer = peripheral.clone();
            tokio::spawn(async move {
                while let Some(command) = cmd_rx.recv().await {
                    let payload = match command {
                        TrainerCommand::Resistance(level) => build_set_target_resistance(level),
                        TrainerCommand::TargetPower(watts) => build_set_target_power(watts),
                    };
                    if let Err(e) = writer
                        .write(&control_point, &payload, WriteType::WithResponse)
                        .await
                    {
                        tracing::warn!(error = %e, "trainer command write failed");
                    }
                }
            });
        }

        self.peripheral = Some(peripheral);
        tracing::info!("trainer connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TrainerError> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(peripheral) = self.peripheral.take() {
            peripheral
                .disconnect()
                .await
                .map_err(|e| TrainerError::Ble(e.to_string()))?;
        }
        tracing::info!("trainer disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn data_channel(&mut self) -> mpsc::Receiver<TrainerData> {
        self.data_rx
            .take()
            .unwrap_or_else(|| mpsc::channel(EVENT_CHANNEL_DEPTH).1)
    }

    fn shift_channel(&mut self) -> mpsc::Receiver<ShiftEvent> {
        self.shift_rx
            .take()
            .unwrap_or_else(|| mpsc::channel(EVENT_CHANNEL_DEPTH).1)
    }

    fn set_resistance(&self, level: f64) -> Result<(), TrainerError> {
        self.send_command(TrainerCommand::Resistance(level))
    }

    fn set_target_power(&self, watts: u16) -> Result<(), TrainerError> {
        self.send_command(TrainerCommand::TargetPower(watts))
    }
}
