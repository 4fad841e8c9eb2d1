//! Heart rate monitor for BLE sensors
//!
//! Finds the first heart rate sensor in range, subscribes to its measurements and
//! prints every update.

mod config;
mod decode;
mod monitor;

use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pulse-monitor")]
#[command(about = "Heart rate monitor for BLE sensors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List nearby BLE devices
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
        /// Bluetooth adapter index (overrides config)
        #[arg(short, long)]
        adapter: Option<usize>,
    },
    /// Connect to the first heart rate sensor found and stream its measurements
    Monitor {
        /// Print one JSON object per update instead of text
        #[arg(long)]
        json: bool,
        /// Give up if no sensor is found within this many seconds (overrides config)
        #[arg(short, long)]
        scan_timeout: Option<u64>,
        /// Bluetooth adapter index (overrides config)
        #[arg(short, long)]
        adapter: Option<usize>,
    },
    /// Decode a raw characteristic value given as hex
    Decode {
        /// 16-bit characteristic UUID, e.g. 2A37
        characteristic: String,
        /// Payload bytes in hex, e.g. 16480003
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { duration, adapter } => {
            let config = load_config()?;
            let index = adapter.unwrap_or(config.adapter_index);
            scan_devices(index, duration).await?;
        }
        Commands::Monitor {
            json,
            scan_timeout,
            adapter,
        } => {
            let mut config = load_config()?;
            if let Some(secs) = scan_timeout {
                config.scan_timeout_secs = secs;
            }
            if let Some(index) = adapter {
                config.adapter_index = index;
            }
            monitor::run(&config, json).await?;
        }
        Commands::Decode {
            characteristic,
            payload,
        } => {
            let (kind, value) = decode::decode(&characteristic, &payload)?;
            println!("{kind}: {value}");
        }
    }

    Ok(())
}

fn load_config() -> Result<config::MonitorConfig, config::ConfigError> {
    let home = config::pulse_home()?;
    config::load_or_create(&home)
}

async fn scan_devices(adapter_index: usize, duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for BLE devices ({} seconds)...", duration);

    let adapter = pulse_ble::ble::get_adapter(adapter_index).await?;
    let devices = pulse_ble::ble::scan(&adapter, Duration::from_secs(duration)).await?;

    println!("\nFound {} devices:", devices.len());
    for device in devices {
        let rssi = device
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());
        let marker = if device.is_heart_rate { " [HEART RATE]" } else { "" };

        println!("  {} ({}) RSSI: {}{}", device.name, device.address, rssi, marker);
    }

    Ok(())
}
