// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Instantiation Diagnostics
//!
//! Mechanisms report what they bound through an injected [`DiagnosticSink`]
//! rather than printing. A sink declares its verbosity up front so a
//! mechanism can skip building reports nobody will look at.

use neurocable_config::DiagnosticsSection;
use neurocable_mechanism::{IonStateView, MechanismId, ParameterPack, Value, ValuePtr};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// How much a sink wants to hear
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    #[default]
    Off,
    /// One line per instantiated mechanism
    Summary,
    /// Summary plus every host pointer table and pack field
    Detailed,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(Verbosity::Off),
            "summary" => Ok(Verbosity::Summary),
            "detailed" => Ok(Verbosity::Detailed),
            other => Err(format!("unknown diagnostics verbosity '{}'", other)),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Off => write!(f, "off"),
            Verbosity::Summary => write!(f, "summary"),
            Verbosity::Detailed => write!(f, "detailed"),
        }
    }
}

/// Everything one instantiation produced
#[derive(Debug, Clone)]
pub struct InstantiationReport<'a> {
    pub mechanism: &'a str,
    pub id: MechanismId,
    pub platform: &'static str,
    pub width: usize,
    pub width_padded: usize,
    pub multiplicity: bool,
    pub parameters_h: &'a [ValuePtr],
    pub state_vars_h: &'a [ValuePtr],
    pub ion_states_h: &'a [IonStateView],
    pub globals_h: &'a [Value],
    pub pack: &'a ParameterPack,
}

/// Receiver of instantiation reports
pub trait DiagnosticSink: Send + Sync {
    fn verbosity(&self) -> Verbosity;

    fn instantiated(&self, report: &InstantiationReport<'_>);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn verbosity(&self) -> Verbosity {
        Verbosity::Off
    }

    fn instantiated(&self, _report: &InstantiationReport<'_>) {}
}

/// Emits reports as `tracing` events (`debug!` summaries, `trace!` details)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    verbosity: Verbosity,
}

impl TracingSink {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Sink for the `[diagnostics]` configuration section (unknown names are off)
    pub fn from_section(section: &DiagnosticsSection) -> Self {
        Self::new(section.instantiation.parse().unwrap_or_default())
    }
}

impl DiagnosticSink for TracingSink {
    fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn instantiated(&self, report: &InstantiationReport<'_>) {
        if self.verbosity == Verbosity::Off {
            return;
        }

        debug!(
            mechanism = report.mechanism,
            id = report.id.0,
            platform = report.platform,
            width = report.width,
            width_padded = report.width_padded,
            multiplicity = report.multiplicity,
            "mechanism instantiated"
        );

        if self.verbosity < Verbosity::Detailed {
            return;
        }

        for (i, ptr) in report.parameters_h.iter().enumerate() {
            trace!(mechanism = report.mechanism, "parameters_h[{}] = {:?}", i, ptr);
        }
        for (i, ptr) in report.state_vars_h.iter().enumerate() {
            trace!(mechanism = report.mechanism, "state_vars_h[{}] = {:?}", i, ptr);
        }
        for (i, view) in report.ion_states_h.iter().enumerate() {
            trace!(mechanism = report.mechanism, "ion_states_h[{}] = {:?}", i, view);
        }
        trace!(mechanism = report.mechanism, "globals_h = {:?}", report.globals_h);
        trace!(mechanism = report.mechanism, "pack = {:?}", report.pack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering_and_parse() {
        assert!(Verbosity::Off < Verbosity::Summary);
        assert!(Verbosity::Summary < Verbosity::Detailed);
        assert_eq!("Detailed".parse::<Verbosity>().unwrap(), Verbosity::Detailed);
        assert!("loud".parse::<Verbosity>().is_err());
        assert_eq!(Verbosity::Summary.to_string(), "summary");
    }

    #[test]
    fn test_sink_from_section() {
        let section = DiagnosticsSection {
            instantiation: "summary".to_string(),
        };
        assert_eq!(TracingSink::from_section(&section).verbosity(), Verbosity::Summary);
        let section = DiagnosticsSection {
            instantiation: "bogus".to_string(),
        };
        assert_eq!(TracingSink::from_section(&section).verbosity(), Verbosity::Off);
        assert_eq!(NullSink.verbosity(), Verbosity::Off);
    }
}
