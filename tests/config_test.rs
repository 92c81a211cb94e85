// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;

use anyhow::Result;
use rust_force_sensor::config::{Config, PollingConfig, RegisterAddress, SensorConfig};
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let config = Config {
        sensor: SensorConfig {
            address: "192.168.1.40".to_string(),
            port: 1502,
            axis_device_ids: vec![4, 5],
            register_address: RegisterAddress::PerAxis(vec![10, 12]),
            timeout_ms: 250,
            force_range_n: 50.0,
            counts_full_scale: 32768.0,
            n_per_count: None,
        },
        polling: PollingConfig {
            interval_ms: 20,
            tare_samples: 10,
            bias_delay_ms: 2,
        },
    };

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);

    // A missing file is created with the defaults
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;
    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(default_config.sensor.address, "10.10.10.2");
    assert_eq!(default_config.sensor.axis_device_ids, vec![1, 2, 3]);
    assert_eq!(default_config.polling.interval_ms, 50);

    Ok(())
}

#[test]
fn test_missing_sections_use_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "polling:\n  interval_ms: 100\n  tare_samples: 5\n")?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.sensor, SensorConfig::default());
    assert_eq!(config.polling.interval_ms, 100);
    assert_eq!(config.polling.bias_delay_ms, 0);
    Ok(())
}

#[test]
fn test_schema_violation_writes_sample() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("bad.yaml");
    fs::write(
        &config_path,
        "sensor:\n  address: 127.0.0.1\n  port: \"not a port\"\n",
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(
        err.to_string().contains("validation failed"),
        "unexpected error: {err}"
    );

    let sample_path = temp_dir.path().join("bad.sample.yaml");
    assert!(sample_path.exists());
    let sample = Config::from_file(&sample_path)?;
    assert_eq!(sample, Config::default());
    Ok(())
}

#[test]
fn test_specific_rules_are_enforced_on_load() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("mismatch.yaml");
    let mut config = Config::default();
    config.sensor.register_address = RegisterAddress::PerAxis(vec![0, 1]);
    config.save_to_file(&config_path)?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("register_address"), "{err}");
    assert!(temp_dir.path().join("mismatch.sample.yaml").exists());
    Ok(())
}

#[test]
fn test_apply_args() -> Result<()> {
    let mut config = Config::default();
    config.apply_args(
        Some("127.0.0.1".to_string()),
        Some(5502),
        Some(vec![9]),
        Some(100.0),
    )?;
    assert_eq!(config.sensor.endpoint(), "127.0.0.1:5502");
    assert_eq!(config.sensor.axis_device_ids, vec![9]);
    assert_eq!(config.polling.interval_ms, 10);

    let before = config.clone();
    config.apply_args(None, None, None, None)?;
    assert_eq!(config, before);

    assert!(config.apply_args(None, None, None, Some(0.0)).is_err());
    Ok(())
}
