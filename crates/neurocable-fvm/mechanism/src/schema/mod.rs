// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Mechanism Schema
//!
//! Descriptor records produced by the mechanism compiler and the capability
//! trait the engine consumes them through.
//!
//! ## Adding a New Schema Source
//!
//! 1. Implement `MechanismSchema` for your type
//! 2. Keep names unique within each list
//! 3. Hand it to the engine as `Arc<dyn MechanismSchema>`

pub mod descriptor;
pub mod traits;

pub use descriptor::{FieldInfo, IonDependency, MechanismDescriptor, MechanismKind};
pub use traits::{FieldCounts, MechanismSchema};
