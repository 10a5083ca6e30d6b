// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neurocable Runtime - Standard (Desktop/Server)
//!
//! Host memory for execution spaces that run on the CPU.
//!
//! This module is only available when the `std` feature is enabled.

pub mod host_array;

pub use host_array::{multiply_in_place, HostArray};
