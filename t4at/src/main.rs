//! T4AT - emulated Type 4A tag device
//!
//! Connects to the RF port of an NFC emulator and runs a T4AT device in
//! listen or poll mode until interrupted.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rf_sim::{DeviceCommand, DeviceConfig, DeviceMode, RfReader, RfWriter, T4atDevice};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "t4at",
    version,
    about = "Emulate a T4AT compatible device on an NFC emulator RF port"
)]
struct Cli {
    /// RF server address
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// RF server TCP port
    #[arg(long, default_value_t = 7001)]
    rf_port: u16,

    /// Device role
    #[arg(long, value_enum, default_value_t = Mode::Poll)]
    mode: Mode,

    /// JSON file overriding the default device configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Discover and select tags
    Poll,
    /// Wait to be discovered
    Listen,
}

impl From<Mode> for DeviceMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Poll => DeviceMode::Poll,
            Mode::Listen => DeviceMode::Listen,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DeviceConfig> {
    let Some(path) = path else {
        return Ok(DeviceConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "t4at=info,rf_sim=info,rf_protocol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let stream = match TcpStream::connect((cli.address.as_str(), cli.rf_port)).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!(
                "Failed to connect to RF server at address {}:{}:\n    {}\nMake sure the server is running",
                cli.address, cli.rf_port, e
            );
            std::process::exit(1);
        }
    };
    info!("Connected to RF server at {}:{}", cli.address, cli.rf_port);

    let (read_half, write_half) = stream.into_split();
    let mut device = T4atDevice::new(
        RfReader::new(read_half),
        RfWriter::new(write_half),
        config,
    );

    let (commands, command_rx) = mpsc::channel(8);
    let shutdown = commands.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping T4AT device");
                let _ = shutdown.send(DeviceCommand::Shutdown).await;
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let result = device.run(cli.mode.into(), command_rx).await;
    drop(commands);
    result.context("T4AT device failed")
}
