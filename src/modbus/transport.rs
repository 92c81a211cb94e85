// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Holding register transport
//!
//! The acquisition engine only needs one primitive from the wire: "read one
//! holding register at `address` on unit `device_id`". [`RegisterTransport`]
//! is that capability, plus explicit link management.
//!
//! Sensor gateways and client stacks disagree on how the unit identifier is
//! passed along with a read, so every read carries a [`ReadConvention`]. A
//! transport that does not implement a convention answers
//! [`TransportError::Unsupported`] and the register reader moves on to the next
//! one.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::time;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

/// How the unit identifier travels with a holding register read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadConvention {
    /// The unit is selected on the link, then a counted read is issued.
    UnitSelect,
    /// The unit is passed as a per-request parameter along with an explicit count.
    UnitParameter,
    /// Single register read addressed by device id, count implied.
    DeviceSingle,
}

impl ReadConvention {
    /// Fixed order in which conventions are attempted.
    pub const PRIORITY: [ReadConvention; 3] = [
        ReadConvention::UnitSelect,
        ReadConvention::UnitParameter,
        ReadConvention::DeviceSingle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReadConvention::UnitSelect => "unit_select",
            ReadConvention::UnitParameter => "unit_parameter",
            ReadConvention::DeviceSingle => "device_single",
        }
    }
}

impl fmt::Display for ReadConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transport level failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("read convention {0} is not supported by this transport")]
    Unsupported(ReadConvention),

    #[error("transport is not connected")]
    NotConnected,

    #[error("cannot resolve sensor address {0}")]
    Resolve(String),

    #[error("transport I/O error: {0}")]
    Io(String),

    #[error("Modbus exception: {0}")]
    Exception(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Capability to read holding registers from a Modbus device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegisterTransport: Send {
    /// Open the link. `Ok(false)` means the peer could not be reached.
    async fn connect(&mut self) -> Result<bool, TransportError>;

    /// Release the link. Closing an already closed link is not an error.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Read holding registers starting at `address` on unit `device_id`.
    ///
    /// An empty vector is a valid answer and means the convention produced no data.
    async fn read_holding_registers(
        &mut self,
        convention: ReadConvention,
        device_id: u8,
        address: u16,
    ) -> Result<Vec<u16>, TransportError>;

    /// Human readable peer description, used in logs and error messages.
    fn endpoint(&self) -> String;
}

/// [`RegisterTransport`] backed by a `tokio-modbus` TCP client context.
///
/// The unit identifier is switched on the client context before each read,
/// which is the [`ReadConvention::UnitSelect`] convention. Connect and every
/// read are bounded by the configured timeout.
pub struct TokioModbusTransport {
    host: String,
    port: u16,
    timeout: Option<Duration>,
    context: Option<Context>,
}

impl TokioModbusTransport {
    pub fn new(host: impl Into<String>, port: u16, timeout: Option<Duration>) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            context: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.context.is_some()
    }
}

/// Resolve `host:port` into the first matching socket address.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let mut addresses = tokio::net::lookup_host((host, port))
        .await
        .map_err(|err| TransportError::Resolve(format!("{host}:{port}: {err}")))?;
    addresses
        .next()
        .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}")))
}

/// Run `future`, failing with [`TransportError::Timeout`] once `limit` elapses.
async fn with_deadline<T>(
    limit: Option<Duration>,
    future: impl Future<Output = T>,
) -> Result<T, TransportError> {
    match limit {
        Some(limit) => time::timeout(limit, future)
            .await
            .map_err(|_| TransportError::Timeout(limit)),
        None => Ok(future.await),
    }
}

#[async_trait]
impl RegisterTransport for TokioModbusTransport {
    async fn connect(&mut self) -> Result<bool, TransportError> {
        if self.context.is_some() {
            return Ok(true);
        }

        let socket_addr = resolve(&self.host, self.port).await?;
        debug!("Connecting to Modbus sensor at {}", socket_addr);

        match with_deadline(self.timeout, tcp::connect(socket_addr)).await {
            Ok(Ok(context)) => {
                info!("Modbus link established with {}", socket_addr);
                self.context = Some(context);
                Ok(true)
            }
            Ok(Err(err)) => {
                warn!("Modbus connection to {} failed: {}", socket_addr, err);
                Ok(false)
            }
            Err(err) => {
                warn!("Modbus connection to {} failed: {}", socket_addr, err);
                Ok(false)
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut context) = self.context.take() else {
            return Ok(());
        };

        debug!("Closing Modbus link with {}", self.endpoint());
        let result = context.disconnect().await;
        if let Err(err) = result {
            return Err(TransportError::Io(err.to_string()));
        }
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        convention: ReadConvention,
        device_id: u8,
        address: u16,
    ) -> Result<Vec<u16>, TransportError> {
        if convention != ReadConvention::UnitSelect {
            return Err(TransportError::Unsupported(convention));
        }

        let limit = self.timeout;
        let context = self.context.as_mut().ok_or(TransportError::NotConnected)?;
        context.set_slave(Slave(device_id));

        let outcome = match with_deadline(limit, context.read_holding_registers(address, 1)).await
        {
            Ok(Ok(Ok(words))) => Ok(words),
            Ok(Ok(Err(exception))) => Err(TransportError::Exception(format!("{exception:?}"))),
            Ok(Err(err)) => Err(TransportError::Io(err.to_string())),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(words) => debug!(
                "Unit {} register {} -> {:?}",
                device_id, address, words
            ),
            // The peer answered, the link is still usable.
            Err(TransportError::Exception(_)) => {}
            Err(err) => {
                warn!(
                    "Dropping Modbus link with {} after read failure: {}",
                    self.endpoint(),
                    err
                );
                self.context = None;
            }
        }

        outcome
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
