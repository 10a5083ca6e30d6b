//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges. All problems are collected and
//! reported together.

use crate::{ConfigError, ConfigResult, NeurocableConfig};

/// Known backend kinds
pub const BACKEND_KINDS: &[&str] = &["cpu", "wgpu", "gpu", "auto"];

/// Known instantiation diagnostic levels
pub const DIAGNOSTIC_LEVELS: &[&str] = &["off", "summary", "detailed"];

/// Known log levels
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Known log formats
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NotPowerOfTwo { field: String, value: usize },
    Zero { field: String },
    UnknownName { field: String, value: String, allowed: &'static [&'static str] },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPowerOfTwo { field, value } => {
                write!(f, "{} = {} must be a non-zero power of two", field, value)
            }
            Self::Zero { field } => write!(f, "{} must be positive", field),
            Self::UnknownName {
                field,
                value,
                allowed,
            } => write!(
                f,
                "{} = '{}' is not one of [{}]",
                field,
                value,
                allowed.join(", ")
            ),
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &NeurocableConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_backend(config, &mut errors);
    validate_names(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_backend(config: &NeurocableConfig, errors: &mut Vec<ConfigValidationError>) {
    let backend = &config.backend;
    for (field, value) in [
        ("backend.cpu_alignment", backend.cpu_alignment),
        ("backend.gpu_alignment", backend.gpu_alignment),
    ] {
        if !value.is_power_of_two() {
            errors.push(ConfigValidationError::NotPowerOfTwo {
                field: field.to_string(),
                value,
            });
        }
    }
    for (field, value) in [
        ("backend.parallel_threshold", backend.parallel_threshold),
        ("backend.gpu_width_threshold", backend.gpu_width_threshold),
    ] {
        if value == 0 {
            errors.push(ConfigValidationError::Zero {
                field: field.to_string(),
            });
        }
    }
}

fn validate_names(config: &NeurocableConfig, errors: &mut Vec<ConfigValidationError>) {
    let checks: [(&str, &str, &'static [&'static str]); 4] = [
        ("backend.kind", &config.backend.kind, BACKEND_KINDS),
        (
            "diagnostics.instantiation",
            &config.diagnostics.instantiation,
            DIAGNOSTIC_LEVELS,
        ),
        ("logging.level", &config.logging.level, LOG_LEVELS),
        ("logging.format", &config.logging.format, LOG_FORMATS),
    ];
    for (field, value, allowed) in checks {
        if !allowed.contains(&value.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::UnknownName {
                field: field.to_string(),
                value: value.to_string(),
                allowed,
            });
        }
    }
}
