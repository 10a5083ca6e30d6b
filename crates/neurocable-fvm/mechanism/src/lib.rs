// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Neurocable Mechanism Types (Backend-Independent)
//!
//! Everything about a mechanism that does not depend on where it runs:
//! - **Types**: scalar aliases, mechanism ids, arena pointers, schema errors
//! - **Schema**: mechanism descriptors and the `MechanismSchema` capability trait
//! - **Layout**: placements, overrides and the padded storage plan
//! - **Parameter Pack**: the flat, `Pod` aggregate kernels execute against
//! - **Tables**: introspection records for samplers and recorders

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod layout;
pub mod ppack;
pub mod schema;
pub mod tables;
pub mod types;

pub use layout::{index_into, round_up, LayoutPlan, MechanismLayout, MechanismOverrides};
pub use ppack::{IonStateView, ParameterPack};
pub use schema::{
    FieldCounts, FieldInfo, IonDependency, MechanismDescriptor, MechanismKind, MechanismSchema,
};
pub use tables::{FieldEntry, FieldTable, GlobalTable, IonTable, IonTableEntry, StateTable};
pub use types::{
    FieldKind, Index, IndexPtr, MechanismId, Result, SchemaError, TablePtr, Value, ValuePtr,
};
