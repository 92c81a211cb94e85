// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Outbound notifications of the polling controller

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use super::wrench::Wrench;

/// Status message attached to every successful poll.
pub const MODBUS_OK: &str = "Modbus OK";

/// One polling result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceSample {
    pub wrench: Wrench,
    /// [`MODBUS_OK`] on success, the failure text otherwise
    pub message: String,
    pub connected: bool,
    pub timestamp: DateTime<Utc>,
}

impl ForceSample {
    pub fn connected(wrench: Wrench) -> Self {
        Self {
            wrench,
            message: MODBUS_OK.to_string(),
            connected: true,
            timestamp: Utc::now(),
        }
    }

    /// Zero wrench carrying `message`.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            wrench: Wrench::ZERO,
            message: message.into(),
            connected: false,
            timestamp: Utc::now(),
        }
    }
}

/// Event forwarded to channel based observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SensorEvent {
    Sample(ForceSample),
    Bias(Wrench),
}

/// Receives polling results and bias changes.
pub trait SensorObserver: Send {
    /// Called once per `poll()`.
    fn on_sample(&mut self, sample: &ForceSample);

    /// Called after every successful tare and every clear.
    fn on_bias(&mut self, bias: &Wrench);
}

impl SensorObserver for UnboundedSender<SensorEvent> {
    fn on_sample(&mut self, sample: &ForceSample) {
        if self.send(SensorEvent::Sample(sample.clone())).is_err() {
            debug!("Sample dropped, no receiver left");
        }
    }

    fn on_bias(&mut self, bias: &Wrench) {
        if self.send(SensorEvent::Bias(*bias)).is_err() {
            debug!("Bias update dropped, no receiver left");
        }
    }
}

/// Observer discarding every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SensorObserver for NullObserver {
    fn on_sample(&mut self, _sample: &ForceSample) {}

    fn on_bias(&mut self, _bias: &Wrench) {}
}
