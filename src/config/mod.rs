// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the force sensor application
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before being deserialized.
//!
//! ## Configuration Structure
//!
//! - `sensor`: how to reach the sensor and how to scale its counts
//! - `polling`: poll cadence and tare settings
//!
//! ## Usage
//!
//! ```no_run
//! use rust_force_sensor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("192.168.1.40".to_string()), // Sensor address
//!     Some(1502),                       // Sensor port
//!     Some(vec![1, 2, 3]),              // Axis device ids
//!     Some(20.0),                       // Poll rate in Hz
//! ).unwrap();
//!
//! println!("Sensor: {}", config.sensor.endpoint());
//! ```

pub mod polling;
pub mod sensor;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use polling::PollingConfig;
pub use sensor::{RegisterAddress, SensorConfig};
pub use utils::{
    is_valid_ip_address, output_config_schema, parse_axis_ids, validate_specific_rules,
};

/// Root configuration structure.
///
/// Each section falls back to its defaults when missing from the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sensor link and calibration.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Poll cadence and tare settings.
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file that
    /// fails validation is left alone, a `.sample.yaml` with the defaults is
    /// written next to it and an error is returned.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(utils::CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only provided values override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `sensor_address` - Host name or IP of the sensor gateway
    /// * `sensor_port` - Modbus TCP port of the sensor
    /// * `axis_device_ids` - Unit ids of the Fx, Fy and Fz axes
    /// * `poll_hz` - Poll rate, converted to `polling.interval_ms`
    pub fn apply_args(
        &mut self,
        sensor_address: Option<String>,
        sensor_port: Option<u16>,
        axis_device_ids: Option<Vec<u8>>,
        poll_hz: Option<f64>,
    ) -> Result<()> {
        if let Some(address) = sensor_address {
            debug!("Overriding sensor address from command line: {}", address);
            self.sensor.address = address;
        }
        if let Some(port) = sensor_port {
            debug!("Overriding sensor port from command line: {}", port);
            self.sensor.port = port;
        }
        if let Some(ids) = axis_device_ids {
            debug!("Overriding axis device ids from command line: {:?}", ids);
            self.sensor.axis_device_ids = ids;
        }
        if let Some(hz) = poll_hz {
            self.polling.interval_ms = PollingConfig::interval_from_hz(hz)?;
            debug!(
                "Overriding poll interval from command line: {} ms",
                self.polling.interval_ms
            );
        }
        Ok(())
    }
}
