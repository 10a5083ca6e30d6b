// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Neurocable Runtime Abstraction
//!
//! Memory model shared by every backend.
//!
//! This crate provides:
//! - **Traits** (always available): `ExecutionSpace`, `DeviceArray`, `Scalar`
//! - **Arenas** (always available): `Arena`, `ArenaSet` bump sub-allocation with
//!   stable 32-bit offsets
//! - **Std Implementation** (behind `std` feature): `HostArray` for CPU spaces
//!
//! ## Features
//!
//! - `default` = `["std"]`
//! - `std` = Host array implementation (Vec-based, parallel)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use neurocable_runtime::{ArenaSet, ExecutionSpace};
//!
//! fn stage<S: ExecutionSpace>(space: &S) -> neurocable_runtime::Result<()> {
//!     let mut arenas = ArenaSet::new(space)?;
//!     let v = arenas.push_values(space, &[-65.0; 4])?;
//!     assert_eq!(arenas.read_values(space, v, 4)?, vec![-65.0; 4]);
//!     Ok(())
//! }
//! ```


/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Traits module (always available)
pub mod traits;

pub mod arena;

// Standard library implementation (behind "std" feature)
#[cfg(feature = "std")]
pub mod std_impl;

// Re-export for convenience
pub use arena::{Arena, ArenaSet, MAX_ARENA_ELEMENTS};
pub use traits::{DeviceArray, ExecutionSpace, Result, RuntimeError, Scalar};

#[cfg(feature = "std")]
pub use std_impl::HostArray;
