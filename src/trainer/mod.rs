//! Trainer link: the narrow interface the session loop drives, plus the
//! BLE/FTMS implementation.

pub mod ble;
pub mod ftms;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use ble::FtmsTrainer;

/// A live sample from the trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerData {
    /// Cadence in RPM
    pub cadence_rpm: f64,
    /// Power in watts
    pub power_w: f64,
}

/// A virtual gear shift request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftEvent {
    /// Harder gear (smaller cog)
    Up,
    /// Easier gear (larger cog)
    Down,
}

/// Errors from the trainer link.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// No BLE adapter available on this machine
    #[error("no Bluetooth adapter found")]
    AdapterNotFound,

    /// No matching trainer was discovered
    #[error("no FTMS trainer found{0}")]
    DeviceNotFound(String),

    /// The trainer is missing a required characteristic
    #[error("trainer is missing characteristic: {0}")]
    CharacteristicMissing(String),

    /// Underlying BLE failure
    #[error("BLE error: {0}")]
    Ble(String),

    /// Operation requires a connection
    #[error("trainer not connected")]
    NotConnected,

    /// Outbound command queue is full; the command was dropped
    #[error("trainer command queue full")]
    CommandQueueFull,
}

/// The trainer interface the session loop drives.
///
/// Channel getters hand out a fresh receiver and keep the sender, so they
/// are called once per session. Command setters must not block: a full
/// outbound queue drops the command and reports it rather than stalling
/// the caller.
#[async_trait]
pub trait TrainerLink: Send {
    /// Establish the connection and start streaming data.
    async fn connect(&mut self) -> Result<(), TrainerError>;

    /// Tear down the connection.
    async fn disconnect(&mut self) -> Result<(), TrainerError>;

    /// Whether the link is currently connected.
    fn is_connected(&self) -> bool;

    /// Receiver for live cadence/power samples.
    fn data_channel(&mut self) -> mpsc::Receiver<TrainerData>;

    /// Receiver for gear shift events.
    fn shift_channel(&mut self) -> mpsc::Receiver<ShiftEvent>;

    /// Send a resistance level (0-100) to the trainer.
    fn set_resistance(&self, level: f64) -> Result<(), TrainerError>;

    /// Send an ERG target power in watts to the trainer.
    fn set_target_power(&self, watts: u16) -> Result<(), TrainerError>;
}
