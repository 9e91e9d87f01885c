//! # Rover Control Supervisor
//!
//! Central coordinator for the rover: polls the device drivers at a fixed
//! rate, maintains the shared state store, persists snapshots, and
//! propagates emergency stop.
//!
//! # Usage
//!
//! ```bash
//! # Run against real hardware
//! rover --config config/rover.toml
//!
//! # Run with simulated devices (no hardware required)
//! rover -s
//!
//! # Verbose logging
//! rover -s -v
//!
//! # JSON logs (for log shippers)
//! rover --config config/rover.toml --json
//! ```

#![deny(warnings)]

use clap::Parser;
use rover_common::command::MotorCommand;
use rover_common::config::RoverConfig;
use rover_core::orchestrator::Orchestrator;
use rover_core::persist::JsonlSink;
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Rover control supervisor
#[derive(Parser, Debug)]
#[command(name = "rover")]
#[command(version)]
#[command(about = "Rover control core: device polling, state store, persistence")]
#[command(long_about = None)]
struct Args {
    /// Path to the rover configuration file (rover.toml)
    #[arg(short, long, default_value = "config/rover.toml")]
    config: PathBuf,

    /// Use simulated devices instead of the configured serial ports
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("rover startup failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_tracing(&args);

    info!("🚀 Rover supervisor v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = RoverConfig::load(&args.config)?;
    info!(
        rover = %config.rover.name,
        poll_rate_hz = config.rover.poll_rate_hz,
        "configuration loaded from {}",
        args.config.display()
    );

    let (drivers, motor_handle) = if args.simulate {
        info!("Simulation mode enabled");
        rover_core::drivers::simulated_drivers(&config)
    } else {
        #[cfg(feature = "serial")]
        {
            rover_core::drivers::serial_drivers(&config)
        }
        #[cfg(not(feature = "serial"))]
        {
            error!("built without serial support; rerun with --simulate");
            std::process::exit(1);
        }
    };

    let sink = JsonlSink::new(&config.persistence.path);
    info!(
        "snapshot log: {} (every {} ms)",
        config.persistence.path.display(),
        config.rover.persist_interval_ms
    );

    let mut orchestrator = Orchestrator::new(&config, drivers);
    let store = orchestrator.store();
    orchestrator.start(Box::new(sink)).await?;

    // In simulation, exercise the drive path so the snapshot log shows
    // motion. Real command sources (dashboard, gamepad bridge) attach to
    // the same handle.
    if args.simulate {
        motor_handle.send(MotorCommand::Forward { speed: 0 });
    }
    let _motor_handle = motor_handle;

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Received shutdown signal (Ctrl+C)"),
        Err(e) => error!("Unable to listen for shutdown signal: {e}"),
    }

    orchestrator.stop().await;

    let final_state = store.snapshot();
    info!("📊 Final system state:");
    info!("  - Devices reporting: {}", final_state.readings.len());
    info!("  - Emergency stop: {}", final_state.emergency_stopped);
    info!("  - Recorded errors: {}", final_state.error_log.len());
    for (device_id, reading) in &final_state.readings {
        info!("  - {}: {:?}", device_id, reading.status);
    }

    info!("🏁 Rover supervisor shutdown complete");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
