// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force sensor link and calibration configuration
//!
//! This module defines the structures describing how to reach the force sensor
//! over Modbus TCP and how its raw counts are scaled into newtons.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::conversion::{
    n_per_count, DEFAULT_COUNTS_FULL_SCALE, DEFAULT_FORCE_RANGE_N,
};
use crate::acquisition::{AxisAddressTable, SensorResult};

/// Holding register location of the axes.
///
/// A single number uses the same register on every unit; a list gives one
/// register per axis, in the order of `axis_device_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterAddress {
    Single(u16),
    PerAxis(Vec<u16>),
}

impl Default for RegisterAddress {
    fn default() -> Self {
        RegisterAddress::Single(0)
    }
}

/// Configuration of the Modbus force sensor.
///
/// # Example
///
/// ```
/// use rust_force_sensor::config::{RegisterAddress, SensorConfig};
///
/// let sensor_config = SensorConfig {
///     address: "192.168.1.40".to_string(),
///     axis_device_ids: vec![1, 2],
///     register_address: RegisterAddress::PerAxis(vec![0, 4]),
///     ..SensorConfig::default()
/// };
/// assert_eq!(sensor_config.address_table().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Host name or IP address of the sensor gateway.
    pub address: String,

    /// Modbus TCP port, 502 on most devices.
    pub port: u16,

    /// Unit identifiers of the Fx, Fy and Fz axes, in that order.
    ///
    /// Fewer than three ids is allowed; the missing axes read as 0 N.
    pub axis_device_ids: Vec<u8>,

    /// Holding register of each axis.
    pub register_address: RegisterAddress,

    /// Connect and read deadline in milliseconds.
    pub timeout_ms: u64,

    /// Force corresponding to `counts_full_scale` counts.
    pub force_range_n: f64,

    /// Count magnitude of a full scale reading.
    pub counts_full_scale: f64,

    /// Explicit newtons per count, overriding `force_range_n / counts_full_scale`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_per_count: Option<f64>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: "10.10.10.2".to_string(),
            port: 502,
            axis_device_ids: vec![1, 2, 3],
            register_address: RegisterAddress::default(),
            timeout_ms: 1000,
            force_range_n: DEFAULT_FORCE_RANGE_N,
            counts_full_scale: DEFAULT_COUNTS_FULL_SCALE,
            n_per_count: None,
        }
    }
}

impl SensorConfig {
    /// Effective newtons per count.
    pub fn n_per_count(&self) -> f64 {
        self.n_per_count
            .unwrap_or_else(|| n_per_count(self.force_range_n, self.counts_full_scale))
    }

    /// Axis → `(unit, register)` table.
    pub fn address_table(&self) -> SensorResult<AxisAddressTable> {
        match &self.register_address {
            RegisterAddress::Single(register) => Ok(AxisAddressTable::broadcast(
                &self.axis_device_ids,
                *register,
            )),
            RegisterAddress::PerAxis(registers) => {
                AxisAddressTable::per_axis(&self.axis_device_ids, registers)
            }
        }
    }

    /// Transport deadline, `None` when `timeout_ms` is 0.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
