// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force sensor acquisition engine
//!
//! [`ForceSensor`] combines a [`RegisterTransport`], the per-axis
//! [`RegisterReader`] and the count → newton scale factor, and owns the
//! software bias (tare) vector subtracted from every biased read.
//!
//! The bias is session state: it lives as long as the `ForceSensor` and is
//! never persisted.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time;

use super::conversion::{to_force, to_signed};
use super::error::{SensorError, SensorResult};
use super::reader::{AxisAddressTable, RegisterReader};
use super::wrench::Wrench;
use crate::config::SensorConfig;
use crate::modbus::{ReadConvention, RegisterTransport, TokioModbusTransport, TransportError};

/// Acquisition engine for one force sensor.
pub struct ForceSensor {
    transport: Box<dyn RegisterTransport>,
    reader: RegisterReader,
    n_per_count: f64,
    bias: Wrench,
}

fn validate_scale(n_per_count: f64) -> SensorResult<f64> {
    if n_per_count.is_finite() && n_per_count > 0.0 {
        Ok(n_per_count)
    } else {
        Err(SensorError::Configuration(format!(
            "n_per_count must be > 0 (got {n_per_count})"
        )))
    }
}

impl ForceSensor {
    /// Build an engine over an arbitrary transport.
    pub fn new(
        transport: Box<dyn RegisterTransport>,
        table: AxisAddressTable,
        n_per_count: f64,
    ) -> SensorResult<Self> {
        Ok(Self {
            transport,
            reader: RegisterReader::new(table),
            n_per_count: validate_scale(n_per_count)?,
            bias: Wrench::ZERO,
        })
    }

    /// Build an engine talking Modbus TCP to the sensor described by `config`.
    ///
    /// No connection is attempted here; see [`ForceSensor::connect`].
    pub fn from_config(config: &SensorConfig) -> SensorResult<Self> {
        let transport =
            TokioModbusTransport::new(config.address.clone(), config.port, config.timeout());
        Self::with_transport(config, Box::new(transport))
    }

    /// Build an engine from `config` over the given transport.
    pub fn with_transport(
        config: &SensorConfig,
        transport: Box<dyn RegisterTransport>,
    ) -> SensorResult<Self> {
        Self::new(transport, config.address_table()?, config.n_per_count())
    }

    /// Replace the ordered list of read conventions.
    pub fn with_conventions(mut self, conventions: Vec<ReadConvention>) -> SensorResult<Self> {
        self.reader = RegisterReader::with_conventions(self.reader.table().clone(), conventions)?;
        Ok(self)
    }

    pub fn n_per_count(&self) -> f64 {
        self.n_per_count
    }

    pub fn set_n_per_count(&mut self, n_per_count: f64) -> SensorResult<()> {
        self.n_per_count = validate_scale(n_per_count)?;
        Ok(())
    }

    pub fn bias_vector(&self) -> Wrench {
        self.bias
    }

    pub fn address_table(&self) -> &AxisAddressTable {
        self.reader.table()
    }

    pub fn endpoint(&self) -> String {
        self.transport.endpoint()
    }

    /// Open the link to the sensor.
    ///
    /// A refused or unreachable peer is `Ok(false)`. An address that cannot be
    /// resolved is a configuration error.
    pub async fn connect(&mut self) -> SensorResult<bool> {
        match self.transport.connect().await {
            Ok(connected) => Ok(connected),
            Err(TransportError::Resolve(reason)) => Err(SensorError::Configuration(format!(
                "cannot resolve sensor address {reason}"
            ))),
            Err(err) => Err(SensorError::Connection {
                endpoint: self.transport.endpoint(),
                reason: err.to_string(),
            }),
        }
    }

    /// Release the link. Errors are logged and swallowed.
    pub async fn close(&mut self) {
        if let Err(err) = self.transport.close().await {
            warn!("{}", SensorError::Close(err.to_string()));
        }
    }

    /// Raw register words, one per configured axis, in table order.
    pub async fn read_raw(&mut self) -> SensorResult<Vec<u16>> {
        self.reader.read_all(self.transport.as_mut()).await
    }

    /// Signed counts, one per configured axis.
    pub async fn read_counts(&mut self) -> SensorResult<Vec<i16>> {
        Ok(self.read_raw().await?.into_iter().map(to_signed).collect())
    }

    /// Read the current wrench.
    ///
    /// Axes that are not configured read as 0.0. Unless `unbiased` is set the
    /// bias vector is subtracted.
    pub async fn read(&mut self, unbiased: bool) -> SensorResult<Wrench> {
        let counts = self.read_counts().await?;
        let force = |axis: usize| {
            counts
                .get(axis)
                .map_or(0.0, |&count| to_force(count, self.n_per_count))
        };
        let wrench = Wrench::from_forces(force(0), force(1), force(2));

        if unbiased {
            Ok(wrench)
        } else {
            Ok(wrench - self.bias)
        }
    }

    /// `(fx, fy, fz)` of [`ForceSensor::read`].
    pub async fn read_forces(&mut self, unbiased: bool) -> SensorResult<(f64, f64, f64)> {
        Ok(self.read(unbiased).await?.forces())
    }

    /// The six components of [`ForceSensor::read`].
    pub async fn read_force_torque(&mut self, unbiased: bool) -> SensorResult<[f64; 6]> {
        Ok(self.read(unbiased).await?.as_array())
    }

    /// Record the mean of `samples` unbiased reads as the new bias.
    ///
    /// `inter_sample_delay` is waited between consecutive reads. On any read
    /// failure the previous bias is kept.
    pub async fn bias(
        &mut self,
        samples: usize,
        inter_sample_delay: Duration,
    ) -> SensorResult<Wrench> {
        if samples == 0 {
            return Err(SensorError::Configuration("samples must be > 0".to_string()));
        }

        let (mut sum_fx, mut sum_fy, mut sum_fz) = (0.0, 0.0, 0.0);
        for index in 0..samples {
            if index > 0 && !inter_sample_delay.is_zero() {
                time::sleep(inter_sample_delay).await;
            }
            let wrench = self.read(true).await?;
            sum_fx += wrench.fx;
            sum_fy += wrench.fy;
            sum_fz += wrench.fz;
        }

        let count = samples as f64;
        self.bias = Wrench::from_forces(sum_fx / count, sum_fy / count, sum_fz / count);
        info!(
            "Bias updated from {} samples: Fx={:.4} N, Fy={:.4} N, Fz={:.4} N",
            samples, self.bias.fx, self.bias.fy, self.bias.fz
        );
        Ok(self.bias)
    }

    /// Forget the bias.
    pub fn unbias(&mut self) {
        debug!("Bias cleared");
        self.bias = Wrench::ZERO;
    }

    /// Alias of [`ForceSensor::bias`].
    pub async fn tare(
        &mut self,
        samples: usize,
        inter_sample_delay: Duration,
    ) -> SensorResult<Wrench> {
        self.bias(samples, inter_sample_delay).await
    }

    /// Alias of [`ForceSensor::unbias`].
    pub fn clear_tare(&mut self) {
        self.unbias();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::conversion::{
        n_per_count, to_unsigned, DEFAULT_COUNTS_FULL_SCALE, DEFAULT_FORCE_RANGE_N,
    };
    use crate::modbus::MockTransport;

    fn three_axis(transport: &MockTransport, scale: f64) -> ForceSensor {
        ForceSensor::new(
            Box::new(transport.clone()),
            AxisAddressTable::per_axis(&[1, 2, 3], &[0, 1, 2]).unwrap(),
            scale,
        )
        .unwrap()
    }

    fn default_scale() -> f64 {
        n_per_count(DEFAULT_FORCE_RANGE_N, DEFAULT_COUNTS_FULL_SCALE)
    }

    #[test]
    fn test_scale_factor_validation() {
        let table = AxisAddressTable::broadcast(&[1], 0);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = ForceSensor::new(Box::new(MockTransport::new()), table.clone(), bad);
            assert!(matches!(result, Err(SensorError::Configuration(_))));
        }

        let mut sensor = three_axis(&MockTransport::new(), 1.0);
        assert!(sensor.set_n_per_count(-0.5).is_err());
        assert_eq!(sensor.n_per_count(), 1.0);
        assert!(sensor.set_n_per_count(0.25).is_ok());
        assert_eq!(sensor.n_per_count(), 0.25);
    }

    #[tokio::test]
    async fn test_reference_conversion() {
        let transport = MockTransport::new()
            .with_register(1, 0, 0x9C40)
            .with_register(2, 1, 0x2710)
            .with_register(3, 2, 0x0000);
        let mut sensor = three_axis(&transport, default_scale());
        assert_eq!(sensor.connect().await, Ok(true));

        assert_eq!(sensor.read_raw().await, Ok(vec![40000, 10000, 0]));
        assert_eq!(sensor.read_counts().await, Ok(vec![-25536, 10000, 0]));
        assert_eq!(
            sensor.read_forces(true).await,
            Ok((-15.5859375, 6.103515625, 0.0))
        );
        assert_eq!(
            sensor.read_force_torque(false).await,
            Ok([-15.5859375, 6.103515625, 0.0, 0.0, 0.0, 0.0])
        );
    }

    #[tokio::test]
    async fn test_single_axis_defaults_missing_channels() {
        let transport = MockTransport::new().with_register(1, 0, 0x7FFF);
        let mut sensor = ForceSensor::new(
            Box::new(transport.clone()),
            AxisAddressTable::broadcast(&[1], 0),
            1.0,
        )
        .unwrap();
        assert_eq!(sensor.connect().await, Ok(true));

        for _ in 0..3 {
            let wrench = sensor.read(false).await.unwrap();
            assert_eq!(wrench.fx, 32767.0);
            assert_eq!(wrench.fy, 0.0);
            assert_eq!(wrench.fz, 0.0);
        }
    }

    #[tokio::test]
    async fn test_bias_averages_unbiased_reads() {
        let transport = MockTransport::new();
        transport.push_values(1, 0, &[10, 20, 30]);
        transport.set_register(2, 1, 4);
        transport.set_register(3, 2, to_unsigned(-6));
        let mut sensor = three_axis(&transport, 1.0);
        assert_eq!(sensor.connect().await, Ok(true));

        let bias = sensor.bias(3, Duration::ZERO).await.unwrap();
        assert_eq!(bias, Wrench::from_forces(20.0, 4.0, -6.0));
        assert_eq!(sensor.bias_vector(), bias);

        // Fx register now sticks at 30.
        assert_eq!(
            sensor.read(false).await,
            Ok(Wrench::from_forces(10.0, 0.0, 0.0))
        );
    }

    #[tokio::test]
    async fn test_unbias_restores_unbiased_reads() {
        let transport = MockTransport::new()
            .with_register(1, 0, 100)
            .with_register(2, 1, 200)
            .with_register(3, 2, 300);
        let mut sensor = three_axis(&transport, 0.5);
        assert_eq!(sensor.connect().await, Ok(true));

        sensor.bias(5, Duration::ZERO).await.unwrap();
        assert_eq!(sensor.read(false).await, Ok(Wrench::ZERO));

        sensor.unbias();
        assert_eq!(sensor.bias_vector(), Wrench::ZERO);
        let unbiased = sensor.read(true).await.unwrap();
        assert_eq!(sensor.read(false).await, Ok(unbiased));
        assert_eq!(unbiased, Wrench::from_forces(50.0, 100.0, 150.0));
    }

    #[tokio::test]
    async fn test_bias_rejects_zero_samples() {
        let transport = MockTransport::new();
        let mut sensor = three_axis(&transport, 1.0);
        let result = sensor.bias(0, Duration::ZERO).await;
        assert!(matches!(result, Err(SensorError::Configuration(_))));
        assert_eq!(transport.reads(), 0);
    }

    #[tokio::test]
    async fn test_failed_bias_keeps_previous_bias() {
        let transport = MockTransport::new()
            .with_register(1, 0, 8)
            .with_register(2, 1, 8)
            .with_register(3, 2, 8);
        let mut sensor = three_axis(&transport, 1.0);
        assert_eq!(sensor.connect().await, Ok(true));
        let first = sensor.bias(1, Duration::ZERO).await.unwrap();

        transport.set_register(1, 0, 100);
        // Two full samples, then the third sample fails on its first axis.
        transport.fail_after(6, TransportError::Io("cable unplugged".to_string()));
        let result = sensor.bias(4, Duration::ZERO).await;
        assert!(matches!(
            result,
            Err(SensorError::Acquisition { device_id: 1, .. })
        ));
        assert_eq!(sensor.bias_vector(), first);
    }

    #[tokio::test]
    async fn test_read_is_all_or_nothing() {
        let transport = MockTransport::new()
            .with_register(1, 0, 1)
            .with_register(2, 1, 2);
        let mut sensor = three_axis(&transport, 1.0);
        assert_eq!(sensor.connect().await, Ok(true));

        let result = sensor.read_raw().await;
        assert!(matches!(
            result,
            Err(SensorError::Acquisition { device_id: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_close_swallows_errors() {
        let transport = MockTransport::new();
        transport.fail_close(TransportError::Io("already reset".to_string()));
        let mut sensor = three_axis(&transport, 1.0);
        sensor.close().await;
        sensor.close().await;
        assert_eq!(transport.close_calls(), 2);
    }

    #[tokio::test]
    async fn test_restricted_conventions() {
        let transport = MockTransport::new()
            .accept_only(ReadConvention::DeviceSingle)
            .with_register(1, 0, 3);
        let sensor = ForceSensor::new(
            Box::new(transport.clone()),
            AxisAddressTable::broadcast(&[1], 0),
            1.0,
        )
        .unwrap();

        let mut sensor = sensor
            .with_conventions(vec![ReadConvention::UnitSelect])
            .unwrap();
        assert_eq!(sensor.connect().await, Ok(true));
        assert!(sensor.read_raw().await.is_err());

        let mut sensor = sensor
            .with_conventions(ReadConvention::PRIORITY.to_vec())
            .unwrap();
        assert_eq!(sensor.read_raw().await, Ok(vec![3]));
    }
}
