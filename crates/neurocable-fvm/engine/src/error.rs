// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine error types
//!
//! Every variant is fatal for the cell group that raised it: a mechanism that
//! failed to bind, or a cell group that failed to build, is never stepped.

use crate::mechanism::LifecycleState;
use neurocable_mechanism::{Index, MechanismId, SchemaError};
use neurocable_runtime::RuntimeError;

#[derive(Debug, thiserror::Error)]
pub enum MechanismError {
    /// A required ion (after rebinding) has no ion state in the cell group
    #[error("mechanism '{mechanism}': ion '{ion}' (bound as '{binding}') has no ion state in this cell group")]
    IonBinding {
        mechanism: String,
        ion: String,
        binding: String,
    },

    /// A placement compartment is not covered by the bound ion's node index
    #[error("mechanism '{mechanism}': compartment {cv} is not covered by ion '{ion}'")]
    IonCoverage {
        mechanism: String,
        ion: String,
        cv: Index,
    },

    #[error("mechanism '{mechanism}': '{field}' got {actual} values, instance width is {expected}")]
    SizeMismatch {
        mechanism: String,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("mechanism '{mechanism}' has no parameter or state variable '{field}'")]
    UnknownField { mechanism: String, field: String },

    #[error("mechanism '{mechanism}' has no global '{name}'")]
    UnknownGlobal { mechanism: String, name: String },

    #[error("stimulus {stimulus}: {reason}")]
    InvalidStimulus { stimulus: usize, reason: String },

    #[error("{0} is already registered in this cell group")]
    DuplicateId(MechanismId),

    #[error("mechanism '{mechanism}': cannot {operation} while {state:?}")]
    Lifecycle {
        mechanism: String,
        operation: &'static str,
        state: LifecycleState,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, MechanismError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_error_names_both_ions() {
        let err = MechanismError::IonBinding {
            mechanism: "hh".into(),
            ion: "na".into(),
            binding: "na2".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'na'"));
        assert!(msg.contains("'na2'"));
    }

    #[test]
    fn test_runtime_errors_convert() {
        let err: MechanismError = RuntimeError::Device("lost".into()).into();
        assert!(matches!(err, MechanismError::Runtime(RuntimeError::Device(_))));
    }
}
