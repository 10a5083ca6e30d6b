// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime abstraction traits
//!
//! - **Memory**: `ExecutionSpace`, `DeviceArray`, `Scalar`
//! - **Errors**: `RuntimeError`

pub mod error;
pub mod memory;

// Re-export key types
pub use error::{Result, RuntimeError};
pub use memory::{DeviceArray, ExecutionSpace, Scalar};
