// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust force sensor library
//!
//! Acquisition and calibration of a three axis force sensor reached over
//! Modbus TCP: signed count decoding, newton scaling, software tare and a
//! polling controller that survives link faults.

pub mod acquisition;
pub mod config;
pub mod daemon;
pub mod modbus;
