//! bluemo-nvm - Bluemo telemetry flash tool
//!
//! Starts telemetry logging on a Bluemo device, downloads what its data sink
//! wrote to SPI flash, erases it again, and decodes downloaded images into
//! timestamp-correlated sample records.
//!
//! # Architecture
//!
//! - `bluemo-core` holds the paging operations (region lookup, page scan,
//!   erase-verify walk) and the sample reconstructor. It only knows the
//!   `DeviceSession` trait.
//! - `bluemo-yasp` speaks the device's framed protocol over a serial port or
//!   TCP bridge, implements `DeviceSession`, and decodes flash images.
//!
//! This binary resolves settings from the command line and `bluemo.toml`
//! and runs one command.

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;

/// Log level selected by the number of `-v` flags
fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG applies unless -v is given
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose > 0 {
        logger.filter_level(log_level(cli.verbose));
    }
    logger.init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Collect { device } => {
            let mut client = commands::connect(&config.device(&device)?)?;
            commands::run_collect(&mut client)
        }
        Commands::Download { device, output } => {
            let output = config.image(output);
            let mut client = commands::connect(&config.device(&device)?)?;
            commands::run_download(&mut client, &output)
        }
        Commands::Erase {
            device,
            probe_size,
            yes,
        } => {
            let probe_size = config.probe_size(probe_size);
            let mut client = commands::connect(&config.device(&device)?)?;
            commands::run_erase(&mut client, probe_size, yes)
        }
        Commands::Decode {
            input,
            output,
            chunk_size,
        } => {
            let input = config.image(input);
            let output = config.output(output);
            commands::run_decode(&input, &output, config.chunk_size(chunk_size)).map(|_| ())
        }
        Commands::Check { device } => {
            let mut client = commands::connect(&config.device(&device)?)?;
            commands::run_check(&mut client)
        }
        Commands::Time { device } => {
            let mut client = commands::connect(&config.device(&device)?)?;
            commands::run_time(&mut client)
        }
    }
}
