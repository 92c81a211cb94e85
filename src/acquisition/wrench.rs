// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Force/torque value type

use std::fmt;
use std::ops::Sub;

use serde::{Deserialize, Serialize};

/// A six-component force and torque vector.
///
/// Forces are expressed in newtons. The register map only standardizes the
/// force channels, so the torque components are always `0.0` for wrenches
/// produced by this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wrench {
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
}

impl Wrench {
    /// The zero wrench, used as the initial bias and as the failure payload.
    pub const ZERO: Wrench = Wrench {
        fx: 0.0,
        fy: 0.0,
        fz: 0.0,
        tx: 0.0,
        ty: 0.0,
        tz: 0.0,
    };

    /// Build a wrench from force components with zero torque.
    pub fn from_forces(fx: f64, fy: f64, fz: f64) -> Self {
        Self {
            fx,
            fy,
            fz,
            ..Self::ZERO
        }
    }

    /// `(fx, fy, fz, tx, ty, tz)`
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64, f64) {
        (self.fx, self.fy, self.fz, self.tx, self.ty, self.tz)
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.fx, self.fy, self.fz, self.tx, self.ty, self.tz]
    }

    pub fn forces(&self) -> (f64, f64, f64) {
        (self.fx, self.fy, self.fz)
    }
}

impl Sub for Wrench {
    type Output = Wrench;

    fn sub(self, rhs: Wrench) -> Wrench {
        Wrench {
            fx: self.fx - rhs.fx,
            fy: self.fy - rhs.fy,
            fz: self.fz - rhs.fz,
            tx: self.tx - rhs.tx,
            ty: self.ty - rhs.ty,
            tz: self.tz - rhs.tz,
        }
    }
}

/// `Fx=… N, Fy=… N, Fz=… N`, three decimals unless a precision is given.
impl fmt::Display for Wrench {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(3);
        write!(
            f,
            "Fx={:.*} N, Fy={:.*} N, Fz={:.*} N",
            precision, self.fx, precision, self.fy, precision, self.fz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forces() {
        let wrench = Wrench::from_forces(-15.5859375, 6.103515625, 0.0);
        assert_eq!(
            wrench.to_string(),
            "Fx=-15.586 N, Fy=6.104 N, Fz=0.000 N"
        );
        assert_eq!(format!("{:.1}", wrench), "Fx=-15.6 N, Fy=6.1 N, Fz=0.0 N");
    }

    #[test]
    fn test_subtraction_is_component_wise() {
        let a = Wrench {
            fx: 1.0,
            fy: 2.0,
            fz: 3.0,
            tx: 4.0,
            ty: 5.0,
            tz: 6.0,
        };
        let b = Wrench {
            fx: 0.5,
            fy: 0.25,
            fz: 3.0,
            tx: 1.0,
            ty: 0.0,
            tz: -1.0,
        };
        assert_eq!((a - b).as_tuple(), (0.5, 1.75, 0.0, 3.0, 5.0, 7.0));
    }

    #[test]
    fn test_zero_bias_is_identity() {
        let w = Wrench::from_forces(-15.5859375, 6.103515625, 0.0);
        assert_eq!(w - Wrench::ZERO, w);
        assert_eq!(Wrench::default(), Wrench::ZERO);
    }

    #[test]
    fn test_projections() {
        let w = Wrench::from_forces(1.0, 2.0, 3.0);
        assert_eq!(w.forces(), (1.0, 2.0, 3.0));
        assert_eq!(w.as_array(), [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    }
}
