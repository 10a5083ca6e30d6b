// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurocable
//!
//! Binds membrane mechanisms (ion channels, synapses, pumps) to the shared
//! state of finite-volume cable cell groups and drives their kernels on a CPU
//! or GPU execution space.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! neurocable = "0.1"  # Default: engine + config + observability
//! ```
//!
//! ## Feature Flags
//!
//! - **`engine`** (default): shared state, mechanism instances, cell groups
//! - **`config`** (default): `neurocable.toml` loading
//! - **`observability`** (default): logging initialisation
//! - **`gpu`**: WGPU execution space
//! - **`file-logging`**: JSON log file output
//!
//! ## Usage
//!
//! ```rust,no_run
//! use neurocable::prelude::*;
//! use std::sync::Arc;
//!
//! let descriptor = MechanismDescriptor::from_json(r#"{
//!     "name": "pas",
//!     "parameters": [{"name": "g", "default_value": 0.001}, {"name": "e", "default_value": -70.0}]
//! }"#)?;
//!
//! let shared = SharedState::new(CpuBackend::new(), SharedStateConfig::uniform(4, -65.0, 279.45, 1.0))?;
//! let spec = MechanismSpec::new(Arc::new(descriptor.clone()), Arc::new(StaticKernels::for_schema(&descriptor)), MechanismLayout::uniform(vec![0, 1, 2, 3]));
//! let mut group = CellGroupMechanisms::build(shared, vec![spec], Arc::new(NullSink))?;
//! group.initialize()?;
//! group.step(0.025, 100.0)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: neurocable-mechanism                       │
//! │  (Descriptor schema, layout plan, parameter pack)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Runtime: neurocable-runtime                            │
//! │  (Execution spaces, arenas, host arrays)                │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine: neurocable-engine                              │
//! │  (CPU/WGPU backends, shared state, cell groups)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use neurocable_mechanism as mechanism;
pub use neurocable_runtime as runtime;

// Re-export components
#[cfg(feature = "engine")]
pub use neurocable_engine as engine;

#[cfg(feature = "config")]
pub use neurocable_config as config;

#[cfg(feature = "observability")]
pub use neurocable_observability as observability;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend and diagnostic sink described by a loaded configuration
#[cfg(feature = "engine")]
pub fn engine_settings(
    config: &neurocable_config::NeurocableConfig,
) -> (engine::BackendType, engine::BackendConfig, engine::TracingSink) {
    let (backend_type, backend_config) = engine::BackendConfig::from_section(&config.backend);
    let sink = engine::TracingSink::from_section(&config.diagnostics);
    (backend_type, backend_config, sink)
}

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::mechanism::{
        FieldInfo, Index, IonDependency, MechanismDescriptor, MechanismId, MechanismKind,
        MechanismLayout, MechanismOverrides, MechanismSchema, ParameterPack, Value,
    };
    pub use crate::runtime::{ArenaSet, ExecutionSpace};

    #[cfg(feature = "engine")]
    pub use crate::engine::{
        select_backend, BackendConfig, BackendType, CellGroupMechanisms, CpuBackend,
        DeliverableEvent, DiagnosticSink, GapJunction, IonConfig, LifecycleState, Mechanism,
        MechanismError, MechanismKernels, MechanismSpec, NullSink, SampleEvent, SampleEventStream,
        SharedState, SharedStateConfig, StaticKernels, StimulusConfig, TracingSink, Verbosity,
    };

    #[cfg(feature = "gpu")]
    pub use crate::engine::WgpuBackend;

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, NeurocableConfig};

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_logging, CrateDebugFlags, LoggingConfig};
}
