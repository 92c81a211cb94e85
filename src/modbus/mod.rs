// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module holds everything that touches the wire:
//!
//! - [`RegisterTransport`]: the single capability the acquisition engine needs,
//!   "read one holding register on a unit", plus link management.
//! - [`TokioModbusTransport`]: the production implementation on top of the
//!   `tokio-modbus` TCP client.
//! - [`MockTransport`]: a scripted implementation for tests and offline runs.
//! - [`SimulatedForceSensor`]: a Modbus TCP server emulating the sensor register
//!   map, used by the simulator binary and the integration tests.
//!
//! ## Register Map
//!
//! Each force axis lives on its own unit (device id) and holding register.
//! The register holds the signed axis count as a two's complement 16-bit word;
//! with the default calibration ±32768 counts map to ±20 N.
//!
//! | Axis | Default unit id | Default register |
//! |------|-----------------|------------------|
//! | Fx   | 1               | 0                |
//! | Fy   | 2               | 0                |
//! | Fz   | 3               | 0                |

pub mod mock;
pub mod modbus_server;
pub mod transport;

pub use mock::MockTransport;
pub use modbus_server::SimulatedForceSensor;
pub use transport::{ReadConvention, RegisterTransport, TokioModbusTransport, TransportError};
