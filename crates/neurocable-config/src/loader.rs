// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! The result is validated before it is returned.

use crate::validation::validate_config;
use crate::{ConfigError, ConfigResult, NeurocableConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "neurocable.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "NEUROCABLE_CONFIG_PATH";

/// Find the neurocable configuration file
///
/// Search order:
/// 1. `NEUROCABLE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./neurocable.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides (`"backend.kind" => "cpu"`)
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NeurocableConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: NeurocableConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NEUROCABLE_BACKEND` -> `backend.kind`
/// - `NEUROCABLE_CPU_ALIGNMENT` -> `backend.cpu_alignment`
/// - `NEUROCABLE_GPU_ALIGNMENT` -> `backend.gpu_alignment`
/// - `NEUROCABLE_DIAGNOSTICS` -> `diagnostics.instantiation`
/// - `NEUROCABLE_LOG_LEVEL` -> `logging.level`
///
/// Unparseable numeric values are ignored.
pub fn apply_environment_overrides(config: &mut NeurocableConfig) {
    if let Ok(value) = env::var("NEUROCABLE_BACKEND") {
        config.backend.kind = value;
    }
    if let Ok(value) = env::var("NEUROCABLE_CPU_ALIGNMENT") {
        if let Ok(alignment) = value.parse::<usize>() {
            config.backend.cpu_alignment = alignment;
        }
    }
    if let Ok(value) = env::var("NEUROCABLE_GPU_ALIGNMENT") {
        if let Ok(alignment) = value.parse::<usize>() {
            config.backend.gpu_alignment = alignment;
        }
    }
    if let Ok(value) = env::var("NEUROCABLE_DIAGNOSTICS") {
        config.diagnostics.instantiation = value;
    }
    if let Ok(value) = env::var("NEUROCABLE_LOG_LEVEL") {
        config.logging.level = value;
    }
}

fn parse_number(key: &str, value: &str) -> ConfigResult<usize> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}' is not a number", key, value)))
}

/// Apply CLI argument overrides to configuration
///
/// Keys use the dotted TOML path, e.g. `{"backend.kind": "gpu"}`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for unknown keys or unparseable numbers
pub fn apply_cli_overrides(
    config: &mut NeurocableConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        match key.as_str() {
            "backend.kind" => config.backend.kind = value.clone(),
            "backend.cpu_alignment" => config.backend.cpu_alignment = parse_number(key, value)?,
            "backend.gpu_alignment" => config.backend.gpu_alignment = parse_number(key, value)?,
            "backend.parallel_threshold" => {
                config.backend.parallel_threshold = parse_number(key, value)?
            }
            "backend.gpu_width_threshold" => {
                config.backend.gpu_width_threshold = parse_number(key, value)?
            }
            "diagnostics.instantiation" => config.diagnostics.instantiation = value.clone(),
            "logging.level" => config.logging.level = value.clone(),
            "logging.format" => config.logging.format = value.clone(),
            "logging.file_path" => config.logging.file_path = Some(value.clone()),
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown configuration key '{}'",
                    key
                )))
            }
        }
    }
    Ok(())
}
