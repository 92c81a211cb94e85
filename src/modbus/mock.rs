// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mock register transport
//!
//! This module provides a scripted [`RegisterTransport`] for tests and offline
//! runs. Register values, connection outcomes and read failures are scripted
//! up front; clones share the same state so a test can keep a handle after the
//! transport has been boxed into a sensor.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::debug;

use super::transport::{ReadConvention, RegisterTransport, TransportError};

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    connect_results: VecDeque<Result<bool, TransportError>>,
    accepted_convention: Option<ReadConvention>,
    registers: HashMap<(u8, u16), VecDeque<u16>>,
    fail_after: Option<(usize, TransportError)>,
    close_error: Option<TransportError>,
    reads: usize,
    connect_calls: usize,
    close_calls: usize,
}

/// Scripted transport.
///
/// * Every connect succeeds unless outcomes were queued with
///   [`MockTransport::push_connect_result`].
/// * Each register holds a queue of values. Reads pop the queue until a single
///   value remains, which is then returned forever.
/// * Reading a register that was never scripted yields an empty response.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder variant of [`MockTransport::set_register`].
    pub fn with_register(self, device_id: u8, address: u16, value: u16) -> Self {
        self.set_register(device_id, address, value);
        self
    }

    /// Only answer reads issued with `convention`; other conventions are rejected
    /// as unsupported.
    pub fn accept_only(self, convention: ReadConvention) -> Self {
        self.state().accepted_convention = Some(convention);
        self
    }

    /// Replace the value queue of a register with a single sticky value.
    pub fn set_register(&self, device_id: u8, address: u16, value: u16) {
        self.state()
            .registers
            .insert((device_id, address), VecDeque::from([value]));
    }

    /// Append successive values for a register.
    pub fn push_values(&self, device_id: u8, address: u16, values: &[u16]) {
        self.state()
            .registers
            .entry((device_id, address))
            .or_default()
            .extend(values.iter().copied());
    }

    /// Queue the outcome of the next `connect` call.
    pub fn push_connect_result(&self, result: Result<bool, TransportError>) {
        self.state().connect_results.push_back(result);
    }

    /// Let `successful_reads` more register reads through, then fail every
    /// read with `error`.
    pub fn fail_after(&self, successful_reads: usize, error: TransportError) {
        let mut state = self.state();
        let threshold = state.reads + successful_reads;
        state.fail_after = Some((threshold, error));
    }

    /// Remove any scripted read failure.
    pub fn heal(&self) {
        self.state().fail_after = None;
    }

    /// Make `close` report `error` (the link is released anyway).
    pub fn fail_close(&self, error: TransportError) {
        self.state().close_error = Some(error);
    }

    /// Number of register reads that reached the register map.
    pub fn reads(&self) -> usize {
        self.state().reads
    }

    pub fn connect_calls(&self) -> usize {
        self.state().connect_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }
}

#[async_trait]
impl RegisterTransport for MockTransport {
    async fn connect(&mut self) -> Result<bool, TransportError> {
        let mut state = self.state();
        state.connect_calls += 1;
        let result = state.connect_results.pop_front().unwrap_or(Ok(true));
        state.connected = matches!(result, Ok(true));
        result
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.close_calls += 1;
        state.connected = false;
        match state.close_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn read_holding_registers(
        &mut self,
        convention: ReadConvention,
        device_id: u8,
        address: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(accepted) = state.accepted_convention {
            if accepted != convention {
                return Err(TransportError::Unsupported(convention));
            }
        }
        if let Some((threshold, error)) = &state.fail_after {
            if state.reads >= *threshold {
                return Err(error.clone());
            }
        }

        state.reads += 1;
        let value = match state.registers.get_mut(&(device_id, address)) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().copied(),
            None => None,
        };
        debug!(
            "Mock read unit {} register {} via {} -> {:?}",
            device_id, address, convention, value
        );
        Ok(value.into_iter().collect())
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}
