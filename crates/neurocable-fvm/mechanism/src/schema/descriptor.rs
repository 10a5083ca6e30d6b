// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Mechanism Descriptor
//!
//! Concrete schema record as emitted by the mechanism compiler. A catalogue
//! is a JSON array of descriptors:
//!
//! ```text
//! [{
//!   "name": "hh", "kind": "density",
//!   "parameters": [{"name": "gnabar", "default_value": 0.12}],
//!   "state_vars": [{"name": "m", "default_value": 0.0}],
//!   "globals":    [{"name": "q10", "default_value": 3.0}],
//!   "ions":       [{"name": "na", "write_int_concentration": false}]
//! }]
//! ```

use super::traits::MechanismSchema;
use crate::types::{Result, Value};
use serde::{Deserialize, Serialize};

/// Named scalar with a default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub default_value: Value,
    #[serde(default)]
    pub units: String,
    #[serde(default = "neg_infinity")]
    pub lower_bound: Value,
    #[serde(default = "infinity")]
    pub upper_bound: Value,
}

fn neg_infinity() -> Value {
    Value::NEG_INFINITY
}

fn infinity() -> Value {
    Value::INFINITY
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, default_value: Value) -> Self {
        Self {
            name: name.into(),
            default_value,
            units: String::new(),
            lower_bound: Value::NEG_INFINITY,
            upper_bound: Value::INFINITY,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }
}

/// Ion used by a mechanism
///
/// The writer flags record intent only. Whether two mechanisms may write the
/// same ion is policed by the simulation driver; bound pointers are identical
/// for readers and writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IonDependency {
    pub name: String,
    #[serde(default)]
    pub write_int_concentration: bool,
    #[serde(default)]
    pub write_ext_concentration: bool,
    #[serde(default)]
    pub read_reversal_potential: bool,
    #[serde(default)]
    pub write_reversal_potential: bool,
    #[serde(default)]
    pub expected_ionic_charge: Option<i32>,
}

impl IonDependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            write_int_concentration: false,
            write_ext_concentration: false,
            read_reversal_potential: false,
            write_reversal_potential: false,
            expected_ionic_charge: None,
        }
    }

    /// True if the mechanism declares itself a writer of any ion quantity
    pub fn is_writer(&self) -> bool {
        self.write_int_concentration || self.write_ext_concentration || self.write_reversal_potential
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MechanismKind {
    #[default]
    Density,
    Point,
    ReversalPotential,
    Junction,
}

/// Immutable descriptor shared by all instances of one mechanism type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: MechanismKind,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub globals: Vec<FieldInfo>,
    #[serde(default)]
    pub state_vars: Vec<FieldInfo>,
    #[serde(default)]
    pub parameters: Vec<FieldInfo>,
    #[serde(default)]
    pub ions: Vec<IonDependency>,
}

impl MechanismDescriptor {
    pub fn new(name: impl Into<String>, kind: MechanismKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fingerprint: String::new(),
            globals: Vec::new(),
            state_vars: Vec::new(),
            parameters: Vec::new(),
            ions: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, default_value: Value) -> Self {
        self.parameters.push(FieldInfo::new(name, default_value));
        self
    }

    pub fn with_state_var(mut self, name: impl Into<String>, default_value: Value) -> Self {
        self.state_vars.push(FieldInfo::new(name, default_value));
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, default_value: Value) -> Self {
        self.globals.push(FieldInfo::new(name, default_value));
        self
    }

    pub fn with_ion(mut self, ion: IonDependency) -> Self {
        self.ions.push(ion);
        self
    }

    /// Parse and validate a single descriptor
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parse and validate a catalogue (JSON array of descriptors)
    pub fn catalogue_from_json(json: &str) -> Result<Vec<Self>> {
        let catalogue: Vec<Self> = serde_json::from_str(json)?;
        for descriptor in &catalogue {
            descriptor.validate()?;
        }
        Ok(catalogue)
    }

    /// Names must be unique within each list
    ///
    /// The `with_*` builders do not check; instantiation does.
    pub fn validate(&self) -> Result<()> {
        self.validate_names()
    }
}

impl MechanismSchema for MechanismDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MechanismKind {
        self.kind
    }

    fn parameters(&self) -> &[FieldInfo] {
        &self.parameters
    }

    fn state_vars(&self) -> &[FieldInfo] {
        &self.state_vars
    }

    fn globals(&self) -> &[FieldInfo] {
        &self.globals
    }

    fn ions(&self) -> &[IonDependency] {
        &self.ions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldKind, SchemaError};

    const HH_JSON: &str = r#"{
        "name": "hh",
        "kind": "density",
        "parameters": [
            {"name": "gnabar", "default_value": 0.12, "units": "S / cm2"},
            {"name": "gkbar", "default_value": 0.036},
            {"name": "gl", "default_value": 0.0003}
        ],
        "state_vars": [
            {"name": "m", "default_value": 0.0},
            {"name": "h", "default_value": 0.0},
            {"name": "n", "default_value": 0.0}
        ],
        "globals": [{"name": "q10", "default_value": 3.0}],
        "ions": [
            {"name": "na", "read_reversal_potential": true},
            {"name": "k"}
        ]
    }"#;

    #[test]
    fn test_descriptor_from_json() {
        let d = MechanismDescriptor::from_json(HH_JSON).unwrap();
        assert_eq!(d.name(), "hh");
        assert_eq!(d.kind(), MechanismKind::Density);
        let counts = d.counts();
        assert_eq!(counts.n_parameters, 3);
        assert_eq!(counts.n_state_vars, 3);
        assert_eq!(counts.n_globals, 1);
        assert_eq!(counts.n_ions, 2);
        assert_eq!(d.parameters[0].units, "S / cm2");
        assert_eq!(d.parameters[1].lower_bound, Value::NEG_INFINITY);
        assert!(d.ions[0].read_reversal_potential);
        assert!(!d.ions[1].is_writer());
    }

    #[test]
    fn test_lookup_by_name_follows_declaration_order() {
        let d = MechanismDescriptor::from_json(HH_JSON).unwrap();
        assert_eq!(d.parameter_index("gkbar"), Some(1));
        assert_eq!(d.state_var_index("n"), Some(2));
        assert_eq!(d.global_index("q10"), Some(0));
        assert_eq!(d.parameter_index("m"), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let d = MechanismDescriptor::new("dup", MechanismKind::Point)
            .with_state_var("g", 0.0)
            .with_state_var("g", 1.0);
        match d.validate() {
            Err(SchemaError::DuplicateName { kind, name, .. }) => {
                assert_eq!(kind, FieldKind::StateVariable);
                assert_eq!(name, "g");
            }
            other => panic!("expected duplicate name error, got {:?}", other),
        }
    }

    #[test]
    fn test_same_name_in_different_lists_is_allowed() {
        let d = MechanismDescriptor::new("ok", MechanismKind::Density)
            .with_parameter("x", 1.0)
            .with_state_var("x", 2.0);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_catalogue_parse_error() {
        let err = MechanismDescriptor::catalogue_from_json("[{\"kind\": \"point\"}]").unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }
}
