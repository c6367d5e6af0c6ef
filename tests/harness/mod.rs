// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for request gate attack simulation.
//!
//! This module provides utilities for simulating scanner and flood traffic
//! against the request gate to validate admission controls.

#![allow(dead_code)]

pub mod attacks;
pub mod generators;
pub mod metrics;
