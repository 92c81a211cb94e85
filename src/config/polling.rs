// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Polling cadence and tare configuration

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Settings of the polling daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Period between two polls, in milliseconds. 50 ms is 20 Hz.
    pub interval_ms: u64,

    /// Number of reads averaged by a tare.
    pub tare_samples: usize,

    /// Pause between two tare reads, in milliseconds.
    #[serde(default)]
    pub bias_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            tare_samples: 30,
            bias_delay_ms: 0,
        }
    }
}

impl PollingConfig {
    /// Poll period in milliseconds for a rate of `hz`.
    pub fn interval_from_hz(hz: f64) -> Result<u64> {
        if !hz.is_finite() || hz <= 0.0 {
            anyhow::bail!("Polling rate must be > 0 Hz (got {})", hz);
        }
        Ok((1000.0 / hz).round() as u64)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn bias_delay(&self) -> Duration {
        Duration::from_millis(self.bias_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_hz() {
        assert_eq!(PollingConfig::interval_from_hz(20.0).unwrap(), 50);
        assert_eq!(PollingConfig::interval_from_hz(30.0).unwrap(), 33);
        assert_eq!(PollingConfig::interval_from_hz(1.0).unwrap(), 1000);
        assert!(PollingConfig::interval_from_hz(0.0).is_err());
        assert!(PollingConfig::interval_from_hz(-5.0).is_err());
    }

    #[test]
    fn test_durations() {
        let polling = PollingConfig {
            bias_delay_ms: 5,
            ..PollingConfig::default()
        };
        assert_eq!(polling.interval(), Duration::from_millis(50));
        assert_eq!(polling.bias_delay(), Duration::from_millis(5));
    }
}
