// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-neurocable-engine` and `--debug-all`, plus
//! the `NEUROCABLE_DEBUG` environment variable.

use std::collections::BTreeSet;
use std::env;

use crate::{crate_target, KNOWN_CRATES};

/// Environment variable listing crates to debug (comma-separated, or `all`)
pub const DEBUG_ENV: &str = "NEUROCABLE_DEBUG";

/// Parse debug flags from command-line arguments
///
/// # Example
/// ```rust
/// use neurocable_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-neurocable-engine".to_string()]);
/// assert!(flags.is_enabled("neurocable-engine"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all`
    /// enables every known crate
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enabled_crates.insert(crate_name.to_string());
            }
        }
        flags
    }

    /// Merge a `NEUROCABLE_DEBUG` value: `all` or comma-separated crate names
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enabled_crates.insert(crate_name.to_string());
            }
        }
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` if enabled for the crate, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// `EnvFilter` directives: `{default}` followed by `{target}=debug` per
    /// enabled crate
    pub fn to_filter_string(&self, default_level: &str) -> String {
        let mut filters = vec![default_level.to_string()];
        filters.extend(
            self.enabled_crates
                .iter()
                .map(|name| format!("{}=debug", crate_target(name))),
        );
        filters.join(",")
    }
}

/// Debug flags from the process arguments and `NEUROCABLE_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var(DEBUG_ENV) {
        flags.merge_env_value(&value);
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  {env}={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  {env}=all                               Enable debug for all crates

Examples:
  --debug-neurocable-engine
  {env}=neurocable-engine,neurocable-runtime
"#,
        KNOWN_CRATES.join(", "),
        env = DEBUG_ENV
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-neurocable-engine".to_string()]);
        assert!(flags.is_enabled("neurocable-engine"));
        assert!(!flags.is_enabled("neurocable-runtime"));
    }

    #[test]
    fn test_unrelated_args_ignored() {
        let flags = CrateDebugFlags::from_args(vec!["simulate".to_string(), "--verbose".to_string()]);
        assert!(!flags.any_enabled());
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_env_value() {
        let mut flags = CrateDebugFlags::default();
        flags.merge_env_value(" neurocable-engine, ,neurocable-config ");
        assert!(flags.is_enabled("neurocable-engine"));
        assert!(flags.is_enabled("neurocable-config"));
        assert_eq!(flags.enabled_crates.len(), 2);

        let mut all = CrateDebugFlags::default();
        all.merge_env_value("all");
        assert_eq!(all.enabled_crates.len(), KNOWN_CRATES.len());
    }

    #[test]
    fn test_filter_string_uses_targets() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-neurocable-engine".to_string()]);
        assert_eq!(flags.to_filter_string("warn"), "warn,neurocable_engine=debug");
        assert_eq!(CrateDebugFlags::default().to_filter_string("info"), "info");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-neurocable-engine".to_string()]);
        assert_eq!(flags.log_level("neurocable-engine"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("neurocable-runtime"), tracing::Level::INFO);
    }

    #[test]
    fn test_help_mentions_env() {
        assert!(debug_flags_help().contains("NEUROCABLE_DEBUG=all"));
    }
}
