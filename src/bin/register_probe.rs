// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use clap::Parser;
use rust_force_sensor::acquisition::conversion::{to_force, to_signed};
use rust_force_sensor::acquisition::ForceSensor;
use rust_force_sensor::config::{parse_axis_ids, RegisterAddress, SensorConfig};

/// One-shot read of the force sensor holding registers
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Sensor gateway address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Sensor Modbus TCP port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Comma separated unit ids of the Fx, Fy and Fz axes
    #[clap(long, default_value = "1,2,3")]
    axis_device_ids: String,

    /// Holding register read on every unit
    #[clap(long, default_value = "0")]
    register: u16,

    /// Newtons per count (defaults to 20 N / 32768 counts)
    #[clap(long)]
    n_per_count: Option<f64>,

    /// Connect and read deadline in milliseconds
    #[clap(long, default_value = "1000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let config = SensorConfig {
        address: args.address,
        port: args.port,
        axis_device_ids: parse_axis_ids(&args.axis_device_ids)?,
        register_address: RegisterAddress::Single(args.register),
        timeout_ms: args.timeout_ms,
        n_per_count: args.n_per_count,
        ..SensorConfig::default()
    };

    let mut sensor = ForceSensor::from_config(&config)?;
    println!("Connecting to force sensor at {}", config.endpoint());
    if !sensor.connect().await? {
        anyhow::bail!("Could not connect to {}", config.endpoint());
    }

    let raw = sensor
        .read_raw()
        .await
        .context("Failed to read the axis registers")?;
    let scale = sensor.n_per_count();

    println!("Raw register values: {:?}", raw);
    for ((axis, address), value) in ["Fx", "Fy", "Fz"]
        .iter()
        .zip(sensor.address_table().iter())
        .zip(&raw)
    {
        let counts = to_signed(*value);
        println!(
            "{}: unit {} register {} = 0x{:04X} ({} counts) = {:.4} N",
            axis,
            address.device_id,
            address.register,
            value,
            counts,
            to_force(counts, scale)
        );
    }

    sensor.close().await;
    Ok(())
}
