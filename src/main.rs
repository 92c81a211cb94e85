// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the force sensor acquisition client
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;

use rust_force_sensor::acquisition::SensorEvent;
use rust_force_sensor::config::{self, parse_axis_ids, Config};
use rust_force_sensor::daemon::PollingDaemon;

/// Modbus TCP force sensor acquisition client
///
/// While running, type `tare` (or `t`), `clear` (or `c`) and `quit` (or `q`)
/// followed by Enter to control the sensor.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Sensor gateway address
    #[arg(long)]
    sensor_address: Option<String>,

    /// Sensor Modbus TCP port
    #[arg(long)]
    sensor_port: Option<u16>,

    /// Comma separated unit ids of the Fx, Fy and Fz axes (e.g. "1,2,3")
    #[arg(long)]
    axis_device_ids: Option<String>,

    /// Poll rate in Hz
    #[arg(long)]
    poll_hz: Option<f64>,

    /// Tare once the sensor is reachable, before printing samples
    #[arg(long)]
    tare: bool,

    /// Print samples as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    let axis_device_ids = args
        .axis_device_ids
        .as_deref()
        .map(parse_axis_ids)
        .transpose()?;
    config.apply_args(
        args.sensor_address.clone(),
        args.sensor_port,
        axis_device_ids,
        args.poll_hz,
    )?;
    config::validate_specific_rules(&config)?;

    info!(
        "Polling force sensor {} every {} ms",
        config.sensor.endpoint(),
        config.polling.interval_ms
    );

    let (events, mut samples) = mpsc::unbounded_channel();
    let mut daemon = PollingDaemon::new();
    daemon.launch(&config, Box::new(events))?;

    if args.tare && daemon.tare().await.is_none() {
        warn!("Initial tare failed, continuing without bias");
    }

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut commands_open = true;
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(err) = result {
                    error!("Error waiting for shutdown signal: {}", err);
                }
                info!("Received shutdown signal, terminating");
                break;
            }
            event = samples.recv() => match event {
                Some(event) => print_event(&event, args.json)?,
                None => break,
            },
            line = commands.next_line(), if commands_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "t" | "tare" => {
                        if daemon.tare().await.is_none() {
                            warn!("Tare failed");
                        }
                    }
                    "c" | "clear" => daemon.clear().await,
                    "q" | "quit" => break,
                    "" => {}
                    other => warn!("Unknown command '{}', expected tare, clear or quit", other),
                },
                Ok(None) => commands_open = false,
                Err(err) => {
                    warn!("Cannot read commands from stdin: {}", err);
                    commands_open = false;
                }
            },
        }
    }

    daemon.shutdown();
    daemon.join().await?;
    Ok(())
}

fn print_event(event: &SensorEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        SensorEvent::Sample(sample) if sample.connected => println!("{}", sample.wrench),
        SensorEvent::Sample(sample) => {
            println!("{} (disconnected: {})", sample.wrench, sample.message)
        }
        SensorEvent::Bias(bias) => println!("Bias: {}", bias),
    }
    Ok(())
}
