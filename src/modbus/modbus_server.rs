// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated force sensor (Modbus TCP server side)
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! The simulated sensor exposes one holding register per axis, each holding the
//! signed axis count as a two's complement 16-bit word, exactly like the real
//! sensor. Holding registers can also be written, which lets a test or an operator
//! inject values from any Modbus client.
//!
//! ## Usage Example
//!
//! See `src/bin/sensor_simulator.rs` for a standalone server that makes the
//! simulated forces drift over time.

use std::{
    collections::HashMap,
    future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use crate::acquisition::conversion::{to_signed, to_unsigned};

/// A Modbus TCP server emulating the force sensor register map.
///
/// Clones share the same register map, so one clone can be handed to the
/// server while another one keeps updating the simulated forces.
#[derive(Debug, Clone)]
pub struct SimulatedForceSensor {
    /// Holding registers, one per simulated axis
    holding_registers: Arc<Mutex<HashMap<u16, u16>>>,

    /// Scale used by [`SimulatedForceSensor::set_force`]
    n_per_count: f64,
}

impl tokio_modbus::server::Service for SimulatedForceSensor {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// - 0x03: Read Holding Registers
    /// - 0x06: Write Single Register
    /// - 0x10: Write Multiple Registers
    ///
    /// Any other function code will return an IllegalFunction exception.
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Simulated sensor received request: {:?}", req);

        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => {
                register_read(&self.registers(), addr, cnt).map(Response::ReadHoldingRegisters)
            }
            Request::WriteSingleRegister(addr, value) => {
                register_write(&mut self.registers(), addr, std::slice::from_ref(&value))
                    .map(|_| Response::WriteSingleRegister(addr, value))
            }
            Request::WriteMultipleRegisters(addr, values) => {
                register_write(&mut self.registers(), addr, &values)
                    .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        future::ready(res)
    }
}

impl SimulatedForceSensor {
    /// Create a simulated sensor exposing `registers`, all initialised to a zero count.
    pub fn new(registers: &[u16], n_per_count: f64) -> Self {
        let holding_registers = registers.iter().map(|&register| (register, 0)).collect();
        Self {
            holding_registers: Arc::new(Mutex::new(holding_registers)),
            n_per_count,
        }
    }

    fn registers(&self) -> MutexGuard<'_, HashMap<u16, u16>> {
        self.holding_registers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a raw word in `register`, creating the register if needed.
    pub fn set_raw(&self, register: u16, raw: u16) {
        self.registers().insert(register, raw);
    }

    /// Store a signed count in `register`.
    pub fn set_counts(&self, register: u16, count: i16) {
        self.set_raw(register, to_unsigned(count));
    }

    /// Store the count closest to `newtons`, saturating at the 16-bit range.
    pub fn set_force(&self, register: u16, newtons: f64) {
        let counts = (newtons / self.n_per_count)
            .round()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX));
        self.set_counts(register, counts as i16);
    }

    /// Current signed count of `register`, if it exists.
    pub fn counts(&self, register: u16) -> Option<i16> {
        self.registers().get(&register).copied().map(to_signed)
    }

    /// Serve Modbus TCP clients on `listener` until the listener fails.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        info!(
            "Simulated force sensor listening on {}",
            listener.local_addr()?
        );
        let server = Server::new(listener);

        let on_connected = move |stream, socket_addr| {
            let sensor = self.clone();
            async move {
                debug!("Client connected: {}", socket_addr);
                accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                    Ok(Some(sensor.clone()))
                })
            }
        };

        server
            .serve(&on_connected, |err| {
                error!("Simulated sensor connection error: {}", err);
            })
            .await?;
        Ok(())
    }
}

/// Helper function implementing reading registers from a HashMap.
fn register_read(
    registers: &HashMap<u16, u16>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    let mut response_values = Vec::with_capacity(cnt.into());
    for i in 0..cnt {
        let reg_addr = addr.wrapping_add(i);
        match registers.get(&reg_addr) {
            Some(value) => response_values.push(*value),
            None => {
                error!("Exception::IllegalDataAddress - register {}", reg_addr);
                return Err(ExceptionCode::IllegalDataAddress);
            }
        }
    }

    Ok(response_values)
}

/// Write holding registers. Used by both the write single register
/// and write multiple registers requests.
fn register_write(
    registers: &mut HashMap<u16, u16>,
    addr: u16,
    values: &[u16],
) -> Result<(), ExceptionCode> {
    for (i, value) in values.iter().enumerate() {
        let reg_addr = addr.wrapping_add(i as u16);
        match registers.get_mut(&reg_addr) {
            Some(r) => *r = *value,
            None => {
                error!("Exception::IllegalDataAddress - register {}", reg_addr);
                return Err(ExceptionCode::IllegalDataAddress);
            }
        }
    }

    Ok(())
}
