use anyhow::Result;
use clap::Parser;
use gps_beacon::domain::payload::PayloadConfig;
use gps_beacon::domain::settings::{LoadStatus, SettingsService};
use gps_beacon::infrastructure::{logging, radio, serial};
use gps_beacon::{AdvertisingController, BeaconService};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "GPS Beacon")]
#[command(bin_name = "gps_beacon")]
#[command(about = "Broadcast a GPS position over BLE, controlled by serial commands")]
struct Cli {
    /// Serial device to take commands from (stdin/stdout when omitted)
    #[arg(long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level override, e.g. "debug"
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings_service = SettingsService::new(cli.settings)?;
    let settings = settings_service.get_mut();
    if let Some(port) = cli.port {
        settings.serial.port = Some(port);
    }
    if let Some(baud) = cli.baud {
        settings.serial.baud_rate = baud;
    }
    if let Some(level) = cli.log_level {
        settings.log_settings.level = level;
    }
    let settings = settings_service.get().clone();

    let _log_guard = logging::init_logger(&settings.log_settings)?;
    info!(
        "Starting GPS beacon (settings: {})",
        settings_service.path().display()
    );
    match settings_service.status() {
        LoadStatus::Loaded => {}
        LoadStatus::Created => info!("Wrote default settings"),
        LoadStatus::Defaulted(reason) => warn!("Using default settings: {}", reason),
    }

    let radio = radio::init_radio(settings.radio_backend).map_err(|e| {
        error!("Bluetooth init failed: {:#}", e);
        e
    })?;
    let payload = PayloadConfig::new(settings.company_id, &settings.device_name);
    let mut service = BeaconService::new(AdvertisingController::new(radio, payload));

    let (tx, rx) = serial::line_channel(settings.serial.queue_capacity);
    let framer = serial::LineFramer::new(tx, settings.serial.max_line_length);

    match settings.serial.port.as_deref() {
        Some(port) => {
            let stream = serial::open_serial(port, settings.serial.baud_rate)?;
            let (reader, writer) = tokio::io::split(stream);
            tokio::spawn(async move {
                if let Err(e) = serial::pump(reader, framer).await {
                    error!("Serial reader stopped: {:#}", e);
                }
            });
            service.run(rx, writer).await
        }
        None => {
            info!("Reading commands from stdin");
            tokio::spawn(async move {
                if let Err(e) = serial::pump(tokio::io::stdin(), framer).await {
                    error!("Stdin reader stopped: {:#}", e);
                }
            });
            service.run(rx, tokio::io::stdout()).await
        }
    }
}
