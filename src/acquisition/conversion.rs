// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register value conversion
//!
//! The sensor publishes each axis as a single unsigned 16-bit holding register
//! holding a two's complement count. These helpers turn the raw word into a
//! signed count and the count into a physical force.

/// Default full-scale force of the sensor, in newtons.
pub const DEFAULT_FORCE_RANGE_N: f64 = 20.0;

/// Signed counts corresponding to [`DEFAULT_FORCE_RANGE_N`].
pub const DEFAULT_COUNTS_FULL_SCALE: f64 = 32768.0;

/// Interpret a raw holding register as a signed count.
///
/// Values at or above `0x8000` wrap to negative counts (`v - 0x10000`).
pub fn to_signed(raw: u16) -> i16 {
    i16::from_ne_bytes(raw.to_ne_bytes())
}

/// Inverse of [`to_signed`], mostly useful to build register images.
pub fn to_unsigned(count: i16) -> u16 {
    u16::from_ne_bytes(count.to_ne_bytes())
}

/// Scale a signed count into a physical force.
pub fn to_force(count: i16, n_per_count: f64) -> f64 {
    f64::from(count) * n_per_count
}

/// Derive the scale factor from the sensor range.
pub fn n_per_count(force_range_n: f64, counts_full_scale: f64) -> f64 {
    force_range_n / counts_full_scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_signed_matches_twos_complement() {
        for raw in 0..=u16::MAX {
            let expected = if raw < 0x8000 {
                i32::from(raw)
            } else {
                i32::from(raw) - 0x10000
            };
            assert_eq!(i32::from(to_signed(raw)), expected, "raw value {raw:#06x}");
        }
    }

    #[test]
    fn test_signed_round_trip() {
        for count in i16::MIN..=i16::MAX {
            assert_eq!(to_signed(to_unsigned(count)), count);
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(to_signed(0x7FFF), 32767);
        assert_eq!(to_signed(0x8000), -32768);
        assert_eq!(to_signed(0xFFFF), -1);
        assert_eq!(to_unsigned(-25536), 0x9C40);
    }

    #[test]
    fn test_to_force() {
        let scale = n_per_count(DEFAULT_FORCE_RANGE_N, DEFAULT_COUNTS_FULL_SCALE);
        assert_eq!(to_force(0, scale), 0.0);
        assert_eq!(to_force(0, 1234.5), 0.0);
        assert_eq!(to_force(-25536, scale), -15.5859375);
        assert_eq!(to_force(10000, scale), 6.103515625);
        assert_eq!(to_force(i16::MIN, scale), -20.0);
        assert_eq!(to_force(7, 0.5), 3.5);
    }
}
