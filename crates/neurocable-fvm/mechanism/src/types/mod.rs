// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Core Types
//!
//! Scalar aliases, identifiers, arena pointers and schema errors.

pub mod error;
pub mod ids;

pub use error::{FieldKind, Result, SchemaError};
pub use ids::{Index, IndexPtr, MechanismId, TablePtr, Value, ValuePtr};
