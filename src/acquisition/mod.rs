// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force acquisition module
//!
//! This module turns raw holding registers into calibrated forces:
//!
//! - [`conversion`]: 16-bit two's complement decoding and count → newton scaling
//! - [`reader`]: per-axis register reads with read convention fallback
//! - [`engine`]: the [`ForceSensor`] acquisition engine and its bias vector
//! - [`controller`]: the [`PollingController`] connection state machine
//! - [`observer`]: polling results and bias notifications

pub mod controller;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod observer;
pub mod reader;
pub mod wrench;

pub use controller::{ConnectionState, PollingController, SharedController};
pub use engine::ForceSensor;
pub use error::{SensorError, SensorResult};
pub use observer::{ForceSample, NullObserver, SensorEvent, SensorObserver, MODBUS_OK};
pub use reader::{AxisAddress, AxisAddressTable, RegisterReader};
pub use wrench::Wrench;
