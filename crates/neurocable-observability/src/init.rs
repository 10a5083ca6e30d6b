// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! One console layer, plus an optional JSON file layer when the
//! `file-logging` feature is on.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

/// Keeps the file writer alive; logs are flushed when dropped
#[derive(Default)]
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Filter from the configured level and per-crate debug flags
///
/// `RUST_LOG`, when set, replaces both.
pub fn build_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = debug_flags.to_filter_string(&config.level);
    EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = build_filter(debug_flags, config)?;

    let console_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };
    let mut layers = vec![console_layer.with_filter(filter).boxed()];
    #[cfg_attr(not(feature = "file-logging"), allow(unused_mut))]
    let mut guard = LoggingGuard::default();

    if let Some(path) = &config.file_path {
        #[cfg(feature = "file-logging")]
        {
            let (layer, file_guard) = file_layer(path, debug_flags, config)?;
            layers.push(layer);
            guard._file_guard = Some(file_guard);
        }
        #[cfg(not(feature = "file-logging"))]
        {
            let _ = path;
            return Err(anyhow!(
                "Log file configured but neurocable-observability was built without `file-logging`"
            ));
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}

#[cfg(feature = "file-logging")]
fn file_layer(
    path: &std::path::Path,
    debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
) -> Result<(
    Box<dyn Layer<Registry> + Send + Sync>,
    tracing_appender::non_blocking::WorkerGuard,
)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(build_filter(debug_flags, config)?)
        .boxed();
    Ok((layer, guard))
}

/// Initialize logging from process arguments / `NEUROCABLE_DEBUG` with
/// default settings
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&crate::cli::parse_debug_flags(), &LoggingConfig::default())
}
