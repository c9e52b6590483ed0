//! Veloshift - Smart Trainer Controller
//!
//! Main entry point: wires configuration, the BLE trainer link, the ride
//! database and the session loop together, with keyboard control on stdin.

use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use veloshift::session::{RideSession, SessionCommand};
use veloshift::sim::engine::SimulationEngine;
use veloshift::sim::gears::GearSet;
use veloshift::sim::Mode;
use veloshift::storage::{AppConfig, Database, RideStore};
use veloshift::trainer::{FtmsTrainer, ShiftEvent, TrainerLink};
use veloshift::{route, Route};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Veloshift v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;

    let route: Option<Route> = match std::env::args().nth(1) {
        Some(path) => Some(route::load_gpx(Path::new(&path))?),
        None => None,
    };

    let data_dir = AppConfig::data_dir().unwrap_or_else(|| PathBuf::from("."));
    let mut database = Database::open(&data_dir.join("rides.db"))?;

    let mut trainer = FtmsTrainer::new(
        config.trainer.device_name.clone(),
        config.trainer.command_queue_depth,
    );
    let shifts = trainer.shift_sender();

    let gears = GearSet::new(config.bike.chainrings.clone(), config.bike.cassette.clone());
    let mut engine = SimulationEngine::new(gears, config.engine_settings());
    engine.set_mode(config.simulation.starting_mode);

    let (commands, command_rx) = mpsc::channel(16);

    let keyboard_commands = commands.clone();
    tokio::spawn(async move {
        read_keyboard(keyboard_commands, shifts).await;
    });

    let signal_commands = commands.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_commands.send(SessionCommand::Stop).await;
        }
    });

    let session = RideSession::new(engine, route);
    let ride = session
        .run(
            &mut trainer,
            Some(&mut database as &mut dyn RideStore),
            command_rx,
        )
        .await?;
    trainer.disconnect().await?;

    if !ride.points.is_empty() {
        veloshift::recording::exporter::export_json(&ride, &data_dir.join("exports"))?;
    }

    let summary = &ride.summary;
    tracing::info!(
        distance_km = format!("{:.2}", summary.distance_m / 1000.0),
        duration_min = format!("{:.1}", summary.duration_s / 60.0),
        avg_power_w = format!("{:.0}", summary.avg_power_w),
        avg_speed_kmh = format!("{:.1}", summary.avg_speed_kmh),
        "ride complete"
    );
    Ok(())
}

/// Map stdin lines onto session commands.
///
/// u/d shift, p/r pause/resume, +/- adjust FREE resistance, `t <watts>`
/// sets the ERG target, sim/erg/free switch modes, q quits.
async fn read_keyboard(
    commands: mpsc::Sender<SessionCommand>,
    shifts: mpsc::Sender<ShiftEvent>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tracing::info!("controls: u/d shift, p/r pause/resume, +/-, t <watts>, sim/erg/free, q quit");

    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "" => continue,
            "u" => {
                let _ = shifts.send(ShiftEvent::Up).await;
                continue;
            }
            "d" => {
                let _ = shifts.send(ShiftEvent::Down).await;
                continue;
            }
            "p" => SessionCommand::Pause,
            "r" => SessionCommand::Resume,
            "+" => SessionCommand::AdjustManualResistance(5.0),
            "-" => SessionCommand::AdjustManualResistance(-5.0),
            "sim" => SessionCommand::SetMode(Mode::Sim),
            "erg" => SessionCommand::SetMode(Mode::Erg),
            "free" => SessionCommand::SetMode(Mode::Free),
            "q" => SessionCommand::Stop,
            line => {
                if let Some(watts) = line
                    .strip_prefix("t ")
                    .and_then(|raw| raw.trim().parse::<u16>().ok())
                {
                    SessionCommand::SetTargetPower(watts)
                } else {
                    tracing::warn!(input = line, "unrecognized command");
                    continue;
                }
            }
        };

        let stop = command == SessionCommand::Stop;
        if commands.send(command).await.is_err() || stop {
            break;
        }
    }
}
