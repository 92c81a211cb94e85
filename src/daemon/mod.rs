// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon module runs the force sensor polling loop in the background.
//!
//! ## Components
//!
//! * **Poll task**: calls `poll()` on the shared controller at the configured
//!   cadence. Missed ticks are delayed, never bursted.
//! * **Heartbeat**: logs the link status periodically.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_force_sensor::{acquisition::NullObserver, config::Config, daemon::PollingDaemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = PollingDaemon::new();
//!     daemon.launch(&config, Box::new(NullObserver))?;
//!
//!     // Tare on demand while polling continues
//!     daemon.tare().await;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::{PollingDaemon, HEARTBEAT_INTERVAL};
