// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Placement and override records supplied by the discretisation front end

use crate::types::{Index, Result, SchemaError, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where one mechanism instance lives: target compartments with per-site
/// weights and an optional multiplicity
///
/// `multiplicity[i] > 1` means several anatomical sites collapsed onto
/// `cv[i]`; the instance keeps one slot and rescales its state instead of
/// duplicating it. An empty `multiplicity` means "not in use".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MechanismLayout {
    pub cv: Vec<Index>,
    pub weight: Vec<Value>,
    #[serde(default)]
    pub multiplicity: Vec<Index>,
}

impl MechanismLayout {
    /// Placement with unit weights and no multiplicity
    pub fn uniform(cv: Vec<Index>) -> Self {
        let weight = vec![1.0; cv.len()];
        Self {
            cv,
            weight,
            multiplicity: Vec::new(),
        }
    }

    pub fn with_multiplicity(mut self, multiplicity: Vec<Index>) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Number of sites (instance width)
    #[inline]
    pub fn width(&self) -> usize {
        self.cv.len()
    }

    #[inline]
    pub fn uses_multiplicity(&self) -> bool {
        !self.multiplicity.is_empty()
    }

    /// `weight` must match `cv`; `multiplicity`, when present, too
    pub fn validate(&self) -> Result<()> {
        if self.weight.len() != self.cv.len() {
            return Err(SchemaError::PlacementMismatch {
                context: "mechanism placement".to_string(),
                field: "weight",
                expected: self.cv.len(),
                actual: self.weight.len(),
            });
        }
        if self.uses_multiplicity() && self.multiplicity.len() != self.cv.len() {
            return Err(SchemaError::PlacementMismatch {
                context: "mechanism placement".to_string(),
                field: "multiplicity",
                expected: self.cv.len(),
                actual: self.multiplicity.len(),
            });
        }
        Ok(())
    }
}

/// Per-instance overrides
///
/// `ion_rebind` maps the ion name a mechanism declares to the ion state it
/// should bind to instead (identity when absent). `globals` replaces
/// descriptor defaults of global scalars by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MechanismOverrides {
    #[serde(default)]
    pub ion_rebind: BTreeMap<String, String>,
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,
}

impl MechanismOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebind_ion(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.ion_rebind.insert(from.into(), to.into());
        self
    }

    pub fn set_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    /// Name of the ion state `ion` binds to
    pub fn ion_binding<'a>(&'a self, ion: &'a str) -> &'a str {
        self.ion_rebind.get(ion).map(String::as_str).unwrap_or(ion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        let layout = MechanismLayout::uniform(vec![0, 2, 5]);
        assert_eq!(layout.width(), 3);
        assert_eq!(layout.weight, vec![1.0, 1.0, 1.0]);
        assert!(!layout.uses_multiplicity());
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_weight_length_mismatch() {
        let layout = MechanismLayout {
            cv: vec![0, 1],
            weight: vec![1.0],
            multiplicity: vec![],
        };
        match layout.validate() {
            Err(SchemaError::PlacementMismatch { field, expected, actual, .. }) => {
                assert_eq!(field, "weight");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected placement mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplicity_length_mismatch() {
        let layout = MechanismLayout::uniform(vec![0, 1, 2]).with_multiplicity(vec![1, 3]);
        assert!(matches!(
            layout.validate(),
            Err(SchemaError::PlacementMismatch { field: "multiplicity", .. })
        ));
    }

    #[test]
    fn test_ion_binding_defaults_to_identity() {
        let overrides = MechanismOverrides::new().rebind_ion("na", "na2");
        assert_eq!(overrides.ion_binding("na"), "na2");
        assert_eq!(overrides.ion_binding("k"), "k");
    }
}
