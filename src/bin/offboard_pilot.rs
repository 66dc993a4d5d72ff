//! Interactive offboard controller.
//!
//! Usage:
//!   cargo run --bin offboard_pilot -- [OPTIONS]
//!
//! Connects on startup (MAVLink over UDP, or the built-in simulator with
//! `--sim`), then reads one command per line from stdin. Type `help` for the
//! command list.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use offboard_pilot::link::{SimConfig, SimulatedVehicle};
use offboard_pilot::{
    Console, ConsoleFlow, ControllerConfig, MavlinkLink, VehicleLink, VehicleSession,
};

#[derive(Debug, Parser)]
#[command(name = "offboard_pilot", about = "Closed-loop offboard maneuver controller")]
struct Args {
    /// Link address, e.g. udpin:0.0.0.0:14540 or udpout:127.0.0.1:14580
    #[arg(short, long)]
    address: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fly the built-in simulated vehicle instead of a MAVLink autopilot
    #[arg(long)]
    sim: bool,

    /// Noise seed for the simulated vehicle
    #[arg(long, requires = "sim")]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ControllerConfig::default(),
    };
    if let Some(address) = args.address {
        config.address = address;
    }

    let link: Arc<dyn VehicleLink> = if args.sim {
        info!("Using simulated vehicle");
        Arc::new(SimulatedVehicle::new(SimConfig {
            seed: args.seed,
            ..Default::default()
        }))
    } else {
        Arc::new(MavlinkLink::from_config(&config).context("invalid link address")?)
    };

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            println!("{line}");
        }
    });

    let address = if args.sim { "sim" } else { config.address.as_str() }.to_string();
    let session = VehicleSession::new(link, config);
    let console = Console::new(session.clone(), out_tx);

    println!("▶ Connect: {address}");
    if let Err(e) = session.ensure_connected().await {
        println!("[connect] Failed to auto-connect: {e}");
        return Ok(());
    }
    println!("  ✓ Ready");
    console.print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.context("reading stdin")?;
                let flow = match line {
                    Some(line) => console.dispatch(&line).await,
                    None => console.dispatch("exit").await,
                };
                if flow == ConsoleFlow::Exit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted.");
                console.shutdown().await;
                break;
            }
        }
    }

    drop(console);
    drop(session);
    let _ = printer.await;
    Ok(())
}
