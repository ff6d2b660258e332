//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "bluemo-nvm")]
#[command(
    author,
    version,
    about = "Retrieve, erase and decode Bluemo telemetry flash",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML format)
    /// Defaults to ./bluemo.toml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device connection options shared across live commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Device link: dev=PORT[:BAUD] or ip=HOST:PORT
    #[arg(short, long)]
    pub port: Option<String>,

    /// BLE connection handle for the parameter update
    #[arg(long)]
    pub conn_handle: Option<u8>,

    /// Maximum BLE connection interval (units of 1.25 ms)
    #[arg(long)]
    pub conn_interval_max: Option<u16>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start logging RTC syncs and analog samples to SPI flash
    Collect {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Download the written part of SPI flash to an image file
    Download {
        #[command(flatten)]
        device: DeviceArgs,

        /// Image file path [default: nvm_data.dat]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Erase the written part of SPI flash
    Erase {
        #[command(flatten)]
        device: DeviceArgs,

        /// Bytes read at each probe address (hex with 0x prefix)
        #[arg(long, value_parser = parse_hex_u32)]
        probe_size: Option<u32>,

        /// Skip the countdown
        #[arg(short, long)]
        yes: bool,
    },

    /// Decode a flash image into index,value[,ticks] records
    Decode {
        /// Image file path [default: nvm_data.dat]
        input: Option<PathBuf>,

        /// Output file path [default: parsed_data.csv]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bytes fed to the decoder per read
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Show data sink write progress
    Check {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Show device time
    Time {
        #[command(flatten)]
        device: DeviceArgs,
    },
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
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x10"), Ok(16));
        assert_eq!(parse_hex_u32("16"), Ok(16));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn test_parse_erase() {
        let cli = Cli::try_parse_from([
            "bluemo-nvm",
            "-vv",
            "erase",
            "-p",
            "dev=/dev/ttyACM0",
            "--probe-size",
            "0x20",
            "--yes",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Erase {
                device,
                probe_size,
                yes,
            } => {
                assert_eq!(device.port.as_deref(), Some("dev=/dev/ttyACM0"));
                assert_eq!(probe_size, Some(0x20));
                assert!(yes);
            }
            _ => panic!("expected erase"),
        }
    }
}
