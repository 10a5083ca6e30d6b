// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurocable-observability
//!
//! Logging initialisation shared by every neurocable binary and test harness,
//! with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: JSON log file written through a non-blocking appender

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use config::*;
pub use init::*;

/// Known neurocable crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "neurocable",
    "neurocable-mechanism",
    "neurocable-runtime",
    "neurocable-engine",
    "neurocable-config",
    "neurocable-observability",
];

/// `tracing` target of a crate name (`neurocable-engine` → `neurocable_engine`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
