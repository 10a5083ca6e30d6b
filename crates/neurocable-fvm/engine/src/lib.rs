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

//! # Neurocable Mechanism Engine
//!
//! Binds membrane mechanisms to the shared state of a cell group and drives
//! their kernels on a host or GPU execution space.
//!
//! ## Architecture
//! - `shared_state`: voltages, currents, time, ions and the event stream
//! - `mechanism`: instantiation into padded chunks, parameter packs, introspection
//! - `cell_group`: all-or-nothing group construction and the step loop
//! - `backend`: CPU (rayon) and WGPU execution spaces, backend selection
//! - `diagnostics`: post-instantiation reporting through `tracing`

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod cell_group;
pub mod diagnostics;
pub mod error;
pub mod mechanism;
pub mod shared_state;

pub use backend::*;
pub use cell_group::{CellGroupMechanisms, MechanismSpec};
pub use diagnostics::{DiagnosticSink, InstantiationReport, NullSink, TracingSink, Verbosity};
pub use error::{MechanismError, Result};
pub use mechanism::{
    table_ions, table_values, LifecycleState, Mechanism, MechanismKernels, StaticKernels,
};
pub use shared_state::{
    DeliverableEvent, DeliverableEventStream, GapJunction, IonConfig, IonState, SampleEvent,
    SampleEventStream, SharedState, SharedStateConfig, StimulusConfig, StimulusState,
};
