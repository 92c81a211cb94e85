// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Polling and connection controller
//!
//! [`PollingController`] wraps a [`ForceSensor`] with a two state connection
//! machine (`Disconnected` / `Connected`) and reports every outcome to a
//! [`SensorObserver`]. No error ever escapes `poll`, `tare` or `clear`: every
//! fault collapses into `Disconnected` and the next `poll` reconnects.
//!
//! The controller is not internally synchronised. When several tasks drive it,
//! share it as a [`SharedController`] and hold the lock for the whole operation.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use super::engine::ForceSensor;
use super::error::{SensorError, SensorResult};
use super::observer::{ForceSample, SensorObserver};
use super::wrench::Wrench;
use crate::config::SensorConfig;

/// Controller shared between the poll loop and on-demand commands.
pub type SharedController = Arc<tokio::sync::Mutex<PollingController>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

pub struct PollingController {
    sensor: ForceSensor,
    state: ConnectionState,
    last_error: String,
    observer: Box<dyn SensorObserver>,
}

impl PollingController {
    pub fn new(sensor: ForceSensor, observer: Box<dyn SensorObserver>) -> Self {
        Self {
            sensor,
            state: ConnectionState::Disconnected,
            last_error: String::new(),
            observer,
        }
    }

    /// Move the controller behind an async mutex.
    pub fn into_shared(self) -> SharedController {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Text of the most recent fault, empty after a successful connect.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn sensor(&self) -> &ForceSensor {
        &self.sensor
    }

    fn fault(&mut self, err: &SensorError) {
        if self.state == ConnectionState::Connected {
            warn!("Sensor {} disconnected: {}", self.sensor.endpoint(), err);
        }
        self.state = ConnectionState::Disconnected;
        self.last_error = err.to_string();
    }

    /// Connect unless already connected. Returns whether the link is up.
    pub async fn ensure_connected(&mut self) -> bool {
        if self.state == ConnectionState::Connected {
            return true;
        }

        match self.sensor.connect().await {
            Ok(true) => {
                info!("Sensor {} connected", self.sensor.endpoint());
                self.state = ConnectionState::Connected;
                self.last_error.clear();
                true
            }
            Ok(false) => {
                let err = SensorError::Connection {
                    endpoint: self.sensor.endpoint(),
                    reason: "connection refused".to_string(),
                };
                self.last_error = err.to_string();
                false
            }
            Err(err) => {
                self.last_error = err.to_string();
                false
            }
        }
    }

    /// Run one read cycle and report it. Never fails.
    pub async fn poll(&mut self) -> ForceSample {
        let sample = if !self.ensure_connected().await {
            let message = if self.last_error.is_empty() {
                "not connected".to_string()
            } else {
                self.last_error.clone()
            };
            ForceSample::disconnected(message)
        } else {
            match self.sensor.read(false).await {
                Ok(wrench) => ForceSample::connected(wrench),
                Err(err) => {
                    self.fault(&err);
                    ForceSample::disconnected(self.last_error.clone())
                }
            }
        };

        self.observer.on_sample(&sample);
        sample
    }

    /// Average `samples` reads into a new bias and report it.
    pub async fn tare(&mut self, samples: usize) -> Option<Wrench> {
        self.tare_with_delay(samples, Duration::ZERO).await
    }

    /// [`PollingController::tare`] with a pause between samples.
    pub async fn tare_with_delay(&mut self, samples: usize, delay: Duration) -> Option<Wrench> {
        if !self.ensure_connected().await {
            return None;
        }

        match self.sensor.bias(samples, delay).await {
            Ok(bias) => {
                self.observer.on_bias(&bias);
                Some(bias)
            }
            Err(err @ SensorError::Configuration(_)) => {
                warn!("Tare rejected: {}", err);
                self.last_error = err.to_string();
                None
            }
            Err(err) => {
                self.fault(&err);
                None
            }
        }
    }

    /// Drop the bias and report the zero bias.
    pub fn clear(&mut self) {
        self.sensor.unbias();
        self.observer.on_bias(&Wrench::ZERO);
    }

    /// Rebuild the sensor from `config`.
    ///
    /// The new sensor is built first; on a configuration error the running
    /// sensor is kept as is.
    pub async fn reconfigure(&mut self, config: &SensorConfig) -> SensorResult<()> {
        let sensor = ForceSensor::from_config(config)?;
        self.replace_sensor(sensor).await;
        Ok(())
    }

    /// Swap in `sensor`, closing the previous one. Bias and connection state
    /// start over.
    pub async fn replace_sensor(&mut self, sensor: ForceSensor) {
        self.sensor.close().await;
        self.sensor = sensor;
        self.state = ConnectionState::Disconnected;
        self.last_error.clear();
        info!("Sensor reconfigured for {}", self.sensor.endpoint());
    }

    /// Release the link. The next poll reconnects.
    pub async fn close(&mut self) {
        self.sensor.close().await;
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::observer::{SensorEvent, MODBUS_OK};
    use crate::acquisition::reader::AxisAddressTable;
    use crate::modbus::{MockTransport, TransportError};
    use tokio::sync::mpsc;

    fn controller(
        transport: &MockTransport,
    ) -> (PollingController, mpsc::UnboundedReceiver<SensorEvent>) {
        let sensor = ForceSensor::new(
            Box::new(transport.clone()),
            AxisAddressTable::broadcast(&[1, 2, 3], 0),
            1.0,
        )
        .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        (PollingController::new(sensor, Box::new(tx)), rx)
    }

    fn scripted() -> MockTransport {
        MockTransport::new()
            .with_register(1, 0, 1)
            .with_register(2, 0, 2)
            .with_register(3, 0, 3)
    }

    #[tokio::test]
    async fn test_poll_reports_success() {
        let transport = scripted();
        let (mut controller, mut rx) = controller(&transport);
        assert_eq!(controller.state(), ConnectionState::Disconnected);

        let sample = controller.poll().await;
        assert!(sample.connected);
        assert_eq!(sample.message, MODBUS_OK);
        assert_eq!(sample.wrench, Wrench::from_forces(1.0, 2.0, 3.0));
        assert!(controller.is_connected());
        assert_eq!(rx.try_recv().unwrap(), SensorEvent::Sample(sample));

        controller.poll().await;
        assert_eq!(transport.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_poll_connect_refused() {
        let transport = scripted();
        transport.push_connect_result(Ok(false));
        let (mut controller, mut rx) = controller(&transport);

        let sample = controller.poll().await;
        assert!(!sample.connected);
        assert_eq!(sample.wrench, Wrench::ZERO);
        assert_eq!(sample.message, "Connection to mock failed: connection refused");
        assert_eq!(controller.last_error(), sample.message);
        assert!(matches!(rx.try_recv(), Ok(SensorEvent::Sample(_))));
        assert_eq!(transport.reads(), 0);
    }

    #[tokio::test]
    async fn test_connect_error_message_is_recorded() {
        let transport = scripted();
        transport.push_connect_result(Err(TransportError::Io("no route to host".to_string())));
        let (mut controller, _rx) = controller(&transport);

        let sample = controller.poll().await;
        assert!(!sample.connected);
        assert!(sample.message.contains("no route to host"), "{}", sample.message);
    }

    #[tokio::test]
    async fn test_tare_without_connection_emits_nothing() {
        let transport = scripted();
        transport.push_connect_result(Ok(false));
        let (mut controller, mut rx) = controller(&transport);

        assert_eq!(controller.tare(5).await, None);
        assert!(rx.try_recv().is_err());
        assert!(!controller.last_error().is_empty());
    }

    #[tokio::test]
    async fn test_tare_with_zero_samples_keeps_link() {
        let transport = scripted();
        let (mut controller, mut rx) = controller(&transport);
        assert!(controller.ensure_connected().await);

        assert_eq!(controller.tare(0).await, None);
        assert!(controller.is_connected());
        assert!(controller.last_error().contains("samples"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tare_fault_disconnects() {
        let transport = scripted();
        let (mut controller, _rx) = controller(&transport);
        assert!(controller.ensure_connected().await);
        transport.fail_after(1, TransportError::Io("reset by peer".to_string()));

        assert_eq!(controller.tare(2).await, None);
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert!(controller.last_error().contains("device_id=2"));
    }

    #[tokio::test]
    async fn test_tare_then_clear_notifies_bias() {
        let transport = scripted();
        let (mut controller, mut rx) = controller(&transport);

        let bias = controller.tare(3).await.unwrap();
        assert_eq!(bias, Wrench::from_forces(1.0, 2.0, 3.0));
        assert_eq!(rx.try_recv().unwrap(), SensorEvent::Bias(bias));
        assert_eq!(controller.poll().await.wrench, Wrench::ZERO);
        rx.try_recv().unwrap();

        controller.clear();
        assert_eq!(rx.try_recv().unwrap(), SensorEvent::Bias(Wrench::ZERO));
        assert_eq!(controller.sensor().bias_vector(), Wrench::ZERO);
    }

    #[tokio::test]
    async fn test_clear_needs_no_connection() {
        let transport = scripted();
        transport.push_connect_result(Ok(false));
        let (mut controller, mut rx) = controller(&transport);

        controller.clear();
        assert_eq!(rx.try_recv().unwrap(), SensorEvent::Bias(Wrench::ZERO));
        assert_eq!(transport.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_reconfigure_rejects_bad_config() {
        let transport = scripted();
        let (mut controller, _rx) = controller(&transport);
        assert!(controller.ensure_connected().await);

        let config = SensorConfig {
            force_range_n: -1.0,
            ..SensorConfig::default()
        };
        let result = controller.reconfigure(&config).await;
        assert!(matches!(result, Err(SensorError::Configuration(_))));
        assert!(controller.is_connected());
        assert_eq!(transport.close_calls(), 0);
    }

    #[tokio::test]
    async fn test_replace_sensor_resets_state() {
        let transport = scripted();
        let (mut controller, _rx) = controller(&transport);
        controller.tare(1).await.unwrap();

        let replacement = MockTransport::new();
        let sensor = ForceSensor::new(
            Box::new(replacement),
            AxisAddressTable::broadcast(&[1], 0),
            0.5,
        )
        .unwrap();
        controller.replace_sensor(sensor).await;

        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert_eq!(controller.sensor().bias_vector(), Wrench::ZERO);
        assert_eq!(controller.sensor().n_per_count(), 0.5);
        assert_eq!(transport.close_calls(), 1);
        assert!(!transport.is_connected());
    }
}
