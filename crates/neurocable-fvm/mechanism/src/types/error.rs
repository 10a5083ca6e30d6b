// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for schema and placement validation

use core::fmt;

/// Which descriptor list a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Parameter,
    StateVariable,
    Global,
    Ion,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Parameter => write!(f, "parameter"),
            FieldKind::StateVariable => write!(f, "state variable"),
            FieldKind::Global => write!(f, "global"),
            FieldKind::Ion => write!(f, "ion"),
        }
    }
}

/// Errors raised while validating descriptors, placements and ion configs
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("mechanism '{mechanism}': duplicate {kind} name '{name}'")]
    DuplicateName {
        mechanism: String,
        kind: FieldKind,
        name: String,
    },

    #[error("{context}: '{field}' has {actual} entries, expected {expected}")]
    PlacementMismatch {
        context: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid mechanism catalogue: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Parse(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, SchemaError>;
