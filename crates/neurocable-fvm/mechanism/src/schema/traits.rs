// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Capability trait for mechanism schemas
//!
//! Mechanism descriptors come out of an external compiler. The engine never
//! assumes field counts or names at compile time; anything that can list its
//! parameters, state variables, globals and ions with defaults is a valid
//! mechanism schema.

use super::descriptor::{FieldInfo, IonDependency, MechanismKind};
use crate::types::{FieldKind, Result, SchemaError};
use ahash::AHashSet;

/// Field counts that drive the memory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldCounts {
    pub n_parameters: usize,
    pub n_state_vars: usize,
    pub n_globals: usize,
    pub n_ions: usize,
}

/// Static, backend-independent description of one mechanism type
pub trait MechanismSchema: Send + Sync {
    /// Mechanism name (e.g. "hh", "pas", "expsyn")
    fn name(&self) -> &str;

    fn kind(&self) -> MechanismKind;

    /// Per-site parameters, in layout order
    fn parameters(&self) -> &[FieldInfo];

    /// Per-site state variables, in layout order
    fn state_vars(&self) -> &[FieldInfo];

    /// Scalar globals shared by all sites, in layout order
    fn globals(&self) -> &[FieldInfo];

    /// Ions the mechanism reads or writes
    fn ions(&self) -> &[IonDependency];

    fn counts(&self) -> FieldCounts {
        FieldCounts {
            n_parameters: self.parameters().len(),
            n_state_vars: self.state_vars().len(),
            n_globals: self.globals().len(),
            n_ions: self.ions().len(),
        }
    }

    fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters().iter().position(|f| f.name == name)
    }

    fn state_var_index(&self, name: &str) -> Option<usize> {
        self.state_vars().iter().position(|f| f.name == name)
    }

    fn global_index(&self, name: &str) -> Option<usize> {
        self.globals().iter().position(|f| f.name == name)
    }

    /// Names must be unique within each list; by-name lookups resolve to
    /// the first match otherwise
    fn validate_names(&self) -> Result<()> {
        fn fields(list: &[FieldInfo]) -> Vec<&str> {
            list.iter().map(|f| f.name.as_str()).collect()
        }
        check_unique(self.name(), FieldKind::Parameter, fields(self.parameters()))?;
        check_unique(self.name(), FieldKind::StateVariable, fields(self.state_vars()))?;
        check_unique(self.name(), FieldKind::Global, fields(self.globals()))?;
        let ions: Vec<&str> = self.ions().iter().map(|i| i.name.as_str()).collect();
        check_unique(self.name(), FieldKind::Ion, ions)
    }
}

fn check_unique(mechanism: &str, kind: FieldKind, names: Vec<&str>) -> Result<()> {
    let mut seen = AHashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateName {
                mechanism: mechanism.to_string(),
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
