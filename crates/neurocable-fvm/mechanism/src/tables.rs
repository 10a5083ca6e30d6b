// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Introspection tables handed to samplers and recorders

use crate::ppack::IonStateView;
use crate::types::{Value, ValuePtr};

/// Named per-site field: where it lives and what it defaulted to
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: String,
    pub data: ValuePtr,
    pub default_value: Value,
}

/// Parameters then state variables, in descriptor order
pub type FieldTable = Vec<FieldEntry>;

/// State variables only, in descriptor order
pub type StateTable = Vec<FieldEntry>;

/// Global name and current value, in descriptor order
pub type GlobalTable = Vec<(String, Value)>;

/// Ion name as declared by the mechanism and the bound ion state view
/// (`state.index` is the per-site ion index array)
#[derive(Debug, Clone, PartialEq)]
pub struct IonTableEntry {
    pub name: String,
    pub state: IonStateView,
}

pub type IonTable = Vec<IonTableEntry>;
