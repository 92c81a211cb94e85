// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{Config, RegisterAddress};

/// JSON schema embedded at build time.
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Minimum poll period accepted by the configuration, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 10;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./force_sensor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is "localhost".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost")
}

/// Parse a comma separated list of unit identifiers such as `"1, 2,3"`.
///
/// Blank entries are ignored; anything else that is not a number in `0..=255`
/// is an error.
pub fn parse_axis_ids(input: &str) -> Result<Vec<u8>> {
    let ids = input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u8>()
                .with_context(|| format!("Invalid device id '{}'", item))
        })
        .collect::<Result<Vec<u8>>>()?;

    if ids.is_empty() {
        anyhow::bail!("At least one device id is required");
    }
    Ok(ids)
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Port**: the sensor port is not 0
/// - **Scale**: `force_range_n`, `counts_full_scale` and an explicit `n_per_count` are > 0
/// - **Axes**: at least one device id, and one register per axis when a list is given
/// - **Timing**: `timeout_ms > 0`, `interval_ms >= 10`, `tare_samples > 0`
/// - **Address**: a value that is not an IP address only triggers a warning, since
///   host names are resolved at connect time
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");
    let sensor = &config.sensor;

    if sensor.port == 0 {
        anyhow::bail!("Invalid sensor port number: {}", sensor.port);
    }

    if !is_valid_ip_address(&sensor.address) {
        warn!(
            "Sensor address '{}' is not an IP address, it will be resolved at connect time",
            sensor.address
        );
    }

    if !(sensor.force_range_n > 0.0) {
        anyhow::bail!("force_range_n must be > 0 (got {})", sensor.force_range_n);
    }
    if !(sensor.counts_full_scale > 0.0) {
        anyhow::bail!(
            "counts_full_scale must be > 0 (got {})",
            sensor.counts_full_scale
        );
    }
    if let Some(n_per_count) = sensor.n_per_count {
        if !(n_per_count > 0.0) {
            anyhow::bail!("n_per_count must be > 0 (got {})", n_per_count);
        }
    }

    if sensor.axis_device_ids.is_empty() {
        anyhow::bail!("axis_device_ids must contain at least one device id");
    }
    if let RegisterAddress::PerAxis(registers) = &sensor.register_address {
        if registers.len() != sensor.axis_device_ids.len() {
            anyhow::bail!(
                "register_address has {} entries but axis_device_ids has {}",
                registers.len(),
                sensor.axis_device_ids.len()
            );
        }
    }

    if sensor.timeout_ms == 0 {
        anyhow::bail!("timeout_ms must be > 0");
    }

    if config.polling.interval_ms < MIN_INTERVAL_MS {
        anyhow::bail!(
            "polling.interval_ms must be >= {} (got {})",
            MIN_INTERVAL_MS,
            config.polling.interval_ms
        );
    }
    if config.polling.tare_samples == 0 {
        anyhow::bail!("polling.tare_samples must be > 0");
    }

    Ok(())
}
