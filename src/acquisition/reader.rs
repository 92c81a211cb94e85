// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-axis register reader
//!
//! The reader owns the axis address table and the ordered list of read
//! conventions. For every axis it tries the conventions in order and keeps the
//! first answer carrying at least one register.

use log::debug;

use super::error::{SensorError, SensorResult};
use crate::modbus::{ReadConvention, RegisterTransport, TransportError};

/// Where one logical axis lives on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisAddress {
    pub device_id: u8,
    pub register: u16,
}

/// Ordered axis → `(device id, register)` mapping (Fx, Fy, Fz).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisAddressTable {
    axes: Vec<AxisAddress>,
}

impl AxisAddressTable {
    /// Use the same register on every device.
    pub fn broadcast(device_ids: &[u8], register: u16) -> Self {
        Self {
            axes: device_ids
                .iter()
                .map(|&device_id| AxisAddress {
                    device_id,
                    register,
                })
                .collect(),
        }
    }

    /// Pair each device with its own register.
    pub fn per_axis(device_ids: &[u8], registers: &[u16]) -> SensorResult<Self> {
        if device_ids.len() != registers.len() {
            return Err(SensorError::Configuration(format!(
                "address sequence length ({}) must match axis_device_ids length ({})",
                registers.len(),
                device_ids.len()
            )));
        }

        Ok(Self {
            axes: device_ids
                .iter()
                .zip(registers)
                .map(|(&device_id, &register)| AxisAddress {
                    device_id,
                    register,
                })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AxisAddress> {
        self.axes.iter()
    }

    pub fn device_ids(&self) -> Vec<u8> {
        self.axes.iter().map(|axis| axis.device_id).collect()
    }
}

/// Reads one raw register per axis, tolerating transport convention skew.
#[derive(Debug, Clone)]
pub struct RegisterReader {
    table: AxisAddressTable,
    conventions: Vec<ReadConvention>,
}

impl RegisterReader {
    pub fn new(table: AxisAddressTable) -> Self {
        Self {
            table,
            conventions: ReadConvention::PRIORITY.to_vec(),
        }
    }

    /// Restrict or reorder the conventions to try.
    pub fn with_conventions(
        table: AxisAddressTable,
        conventions: Vec<ReadConvention>,
    ) -> SensorResult<Self> {
        if conventions.is_empty() {
            return Err(SensorError::Configuration(
                "at least one read convention is required".to_string(),
            ));
        }
        Ok(Self { table, conventions })
    }

    pub fn table(&self) -> &AxisAddressTable {
        &self.table
    }

    pub fn conventions(&self) -> &[ReadConvention] {
        &self.conventions
    }

    /// Read the first register answered for `axis`.
    ///
    /// Empty answers, Modbus exception replies and unsupported conventions fall
    /// through to the next convention. I/O errors, timeouts and a missing link
    /// abort immediately.
    pub async fn read_register(
        &self,
        transport: &mut dyn RegisterTransport,
        axis: AxisAddress,
    ) -> SensorResult<u16> {
        let mut last_mismatch: Option<TransportError> = None;

        for &convention in &self.conventions {
            match transport
                .read_holding_registers(convention, axis.device_id, axis.register)
                .await
            {
                Ok(words) => match words.first() {
                    Some(&word) => return Ok(word),
                    None => {
                        debug!(
                            "Unit {} register {}: no data with {}",
                            axis.device_id, axis.register, convention
                        );
                    }
                },
                Err(err @ TransportError::Exception(_)) => {
                    debug!(
                        "Unit {} register {}: {} with {}",
                        axis.device_id, axis.register, err, convention
                    );
                    last_mismatch = Some(err);
                }
                Err(err @ TransportError::Unsupported(_)) => {
                    debug!("Unit {}: {}", axis.device_id, err);
                    // An earlier exception reply wins over a skipped convention
                    if !matches!(last_mismatch, Some(TransportError::Exception(_))) {
                        last_mismatch = Some(err);
                    }
                }
                Err(err) => {
                    return Err(SensorError::Acquisition {
                        device_id: axis.device_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let reason = match last_mismatch {
            Some(err) => format!("no read convention returned a register (last: {err})"),
            None => "no read convention returned a register".to_string(),
        };
        Err(SensorError::Acquisition {
            device_id: axis.device_id,
            reason,
        })
    }

    /// Read every axis in table order. All or nothing.
    pub async fn read_all(&self, transport: &mut dyn RegisterTransport) -> SensorResult<Vec<u16>> {
        let mut values = Vec::with_capacity(self.table.len());
        for &axis in self.table.iter() {
            values.push(self.read_register(transport, axis).await?);
        }
        Ok(values)
    }
}
