// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for the acquisition engine

/// Failures raised by the acquisition engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Invalid static parameters. Never retried.
    #[error("Invalid sensor configuration: {0}")]
    Configuration(String),

    /// The link to the sensor could not be established.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    /// A register read failed; no partial result was produced.
    #[error("read_holding_registers failed for device_id={device_id}: {reason}")]
    Acquisition { device_id: u8, reason: String },

    /// Releasing the link failed. Only ever logged.
    #[error("Failed to close sensor link: {0}")]
    Close(String),
}

pub type SensorResult<T> = Result<T, SensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SensorError::Acquisition {
            device_id: 3,
            reason: "no register returned".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "read_holding_registers failed for device_id=3: no register returned"
        );

        let err = SensorError::Configuration("n_per_count must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid sensor configuration: n_per_count must be > 0"
        );
    }
}
