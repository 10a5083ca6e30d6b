// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `neurocable.toml`:
//!
//! ```toml
//! [backend]
//! kind = "auto"              # cpu | wgpu | auto
//! cpu_alignment = 8
//! gpu_alignment = 64
//! parallel_threshold = 4096
//! gpu_width_threshold = 1000000
//!
//! [diagnostics]
//! instantiation = "off"      # off | summary | detailed
//!
//! [logging]
//! level = "info"
//! format = "pretty"          # pretty | compact | json
//! file_path = "logs/neurocable.log"
//! ```

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeurocableConfig {
    pub backend: BackendSection,
    pub diagnostics: DiagnosticsSection,
    pub logging: LoggingSection,
}

/// Execution backend selection and layout alignment
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSection {
    /// "cpu", "wgpu" or "auto"
    pub kind: String,
    /// Padded-width alignment of the CPU backend, in elements
    pub cpu_alignment: usize,
    /// Padded-width alignment of the GPU backend, in elements
    pub gpu_alignment: usize,
    /// Minimum width for parallel CPU primitives
    pub parallel_threshold: usize,
    /// Minimum total mechanism width before auto-selection considers the GPU
    pub gpu_width_threshold: usize,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: "auto".to_string(),
            cpu_alignment: 8,
            gpu_alignment: 64,
            parallel_threshold: 4096,
            gpu_width_threshold: 1_000_000,
        }
    }
}

/// Instantiation diagnostics
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsSection {
    /// "off", "summary" or "detailed"
    pub instantiation: String,
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            instantiation: "off".to_string(),
        }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// "pretty", "compact" or "json"
    pub format: String,
    /// Optional log file (requires the observability `file-logging` feature)
    pub file_path: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}
