//! Elevator Harness
//!
//! Drives an elevator controller over a serial link with pseudo-random load
//! and prints a timestamped JSON trace of everything that happens.
//!
//! # Usage
//!
//! ```bash
//! # List available serial ports
//! elevator-harness ports
//!
//! # Run against the controller, keeping a copy of the trace
//! elevator-harness run -p /dev/ttyACM0 --trace run.jsonl
//! ```
//!
//! The trace goes to stdout, one JSON object per line. Diagnostics go to
//! stderr and follow `RUST_LOG`.

mod error;
mod protocol;
mod serial;
mod sim;
mod trace;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::info;

use serial::port::{DEFAULT_BAUD, DEFAULT_PORT_PATH};
use serial::{PortConfig, SerialConnection};
use sim::{units, Harness, RESET_PAUSE_UNITS};
use trace::TraceLog;

/// Elevator Harness
///
/// Discrete-event load generator for elevator controller firmware
#[derive(Parser)]
#[command(name = "elevator-harness")]
#[command(version = "0.1.0")]
#[command(about = "Drive an elevator controller over serial with random load")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the harness until the controller misbehaves or the link fails
    Run {
        /// Serial port path
        #[arg(short, long, default_value = DEFAULT_PORT_PATH)]
        port: String,

        /// Baud rate
        #[arg(short, long, default_value_t = DEFAULT_BAUD)]
        baud: u32,

        /// Also write the trace to this file
        #[arg(short, long)]
        trace: Option<PathBuf>,
    },

    /// List available serial ports
    Ports,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Run { port, baud, trace } => handle_run(port, baud, trace).await,
        Commands::Ports => serial::port::print_ports(),
    }
}

async fn handle_run(port: String, baud: u32, trace_path: Option<PathBuf>) -> Result<()> {
    let config = PortConfig::new(&port).with_baud_rate(baud);
    let conn = SerialConnection::open(config)?;
    info!("Connected to {} at {} baud", port, baud);

    // Opening the port resets the board.
    tokio::time::sleep(units(RESET_PAUSE_UNITS)).await;

    let lines = serial::spawn_line_reader(conn.try_clone()?);

    let mut trace = TraceLog::stdout();
    if let Some(ref path) = trace_path {
        trace = trace
            .with_file(path)
            .with_context(|| format!("Failed to create trace file: {}", path.display()))?;
        info!("Copying trace to {}", path.display());
    }
    info!("Trace origin is {}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"));

    Harness::new(Box::new(conn), trace)
        .run(lines)
        .await
        .context("Elevator harness stopped")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["elevator-harness", "run"]).unwrap();
        match cli.command {
            Commands::Run { port, baud, trace } => {
                assert_eq!(port, "/dev/tty.usbmodemfd121");
                assert_eq!(baud, 9600);
                assert!(trace.is_none());
            }
            Commands::Ports => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "elevator-harness",
            "-v",
            "run",
            "-p",
            "/dev/ttyACM0",
            "-b",
            "115200",
            "--trace",
            "out.jsonl",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Run { port, baud, trace } => {
                assert_eq!(port, "/dev/ttyACM0");
                assert_eq!(baud, 115200);
                assert_eq!(trace, Some(PathBuf::from("out.jsonl")));
            }
            Commands::Ports => panic!("parsed the wrong subcommand"),
        }
    }
}
