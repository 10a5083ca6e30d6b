// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging configuration types

use anyhow::{bail, Result};
use neurocable_config::LoggingSection;
use std::path::PathBuf;
use std::str::FromStr;

/// Console / file line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => bail!("Unknown log format: {}", other),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level directive (trace, debug, info, warn, error)
    pub level: String,

    pub format: LogFormat,

    /// JSON log file (needs the `file-logging` feature)
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// Translate the `[logging]` configuration section
    pub fn from_section(section: &LoggingSection) -> Result<Self> {
        Ok(LoggingConfig {
            level: section.level.to_lowercase(),
            format: section.format.parse()?,
            file_path: section.file_path.as_ref().map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_section() {
        let section = LoggingSection {
            level: "DEBUG".to_string(),
            format: "json".to_string(),
            file_path: Some("/tmp/neurocable.log".to_string()),
        };
        let config = LoggingConfig::from_section(&section).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/neurocable.log")));
    }

    #[test]
    fn test_unknown_format() {
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LoggingConfig::from_section(&LoggingSection::default()).unwrap(), LoggingConfig::default());
    }
}
