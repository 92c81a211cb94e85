// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Standalone simulated force sensor.
//!
//! The simulated sensor answers on any unit id, so each axis is given its own
//! holding register. Point the client at it with a per-axis register list:
//!
//! ```yaml
//! sensor:
//!   address: 127.0.0.1
//!   port: 5502
//!   axis_device_ids: [1, 2, 3]
//!   register_address: [0, 1, 2]
//! ```

use std::f64::consts::TAU;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use rand::Rng;
use rust_force_sensor::acquisition::conversion::{
    n_per_count, DEFAULT_COUNTS_FULL_SCALE, DEFAULT_FORCE_RANGE_N,
};
use rust_force_sensor::modbus::SimulatedForceSensor;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::{self, Instant};

/// Modbus TCP server emulating a drifting three axis force sensor
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Listen address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Listen port
    #[clap(long, default_value = "5502")]
    port: u16,

    /// First holding register, the Fy and Fz registers follow it
    #[clap(long, default_value = "0")]
    first_register: u16,

    /// Peak simulated force in newtons
    #[clap(long, default_value = "5.0")]
    amplitude: f64,

    /// Period of the simulated drift in seconds
    #[clap(long, default_value = "10.0")]
    drift_period: f64,

    /// Peak random noise added to every axis, in newtons
    #[clap(long, default_value = "0.05")]
    noise: f64,

    /// Register update period in milliseconds
    #[clap(long, default_value = "20")]
    update_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    if !(args.drift_period > 0.0) || args.update_ms == 0 {
        anyhow::bail!("drift-period and update-ms must be > 0");
    }

    let registers: Vec<u16> = (0..3)
        .map(|axis| args.first_register.wrapping_add(axis))
        .collect();
    let sensor = SimulatedForceSensor::new(
        &registers,
        n_per_count(DEFAULT_FORCE_RANGE_N, DEFAULT_COUNTS_FULL_SCALE),
    );

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.address, args.port))?;
    let listener = TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("Failed to bind {}", socket_addr))?;
    info!(
        "Axis registers: Fx={} Fy={} Fz={}",
        registers[0], registers[1], registers[2]
    );

    let server = tokio::spawn(sensor.clone().serve(listener));

    let start = Instant::now();
    let mut ticker = time::interval(Duration::from_millis(args.update_ms));
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let phase = TAU * start.elapsed().as_secs_f64() / args.drift_period;
                let mut rng = rand::rng();
                let mut noise = || {
                    if args.noise > 0.0 {
                        rng.random_range(-args.noise..args.noise)
                    } else {
                        0.0
                    }
                };
                sensor.set_force(registers[0], args.amplitude * phase.sin() + noise());
                sensor.set_force(registers[1], args.amplitude * phase.cos() + noise());
                sensor.set_force(registers[2], 0.5 * args.amplitude * (0.5 * phase).sin() + noise());
            }
            result = &mut ctrl_c => {
                if let Err(err) = result {
                    error!("Error waiting for shutdown signal: {}", err);
                }
                info!("Received shutdown signal, stopping simulator");
                break;
            }
        }
    }

    server.abort();
    Ok(())
}
