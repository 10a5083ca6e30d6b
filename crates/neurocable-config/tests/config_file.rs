// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Loading `neurocable.toml` from disk

use neurocable_config::{load_config, ConfigError, NeurocableConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::fs;

#[test]
fn test_full_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        r#"
[backend]
kind = "wgpu"
cpu_alignment = 16
gpu_alignment = 128
parallel_threshold = 1024
gpu_width_threshold = 50000

[diagnostics]
instantiation = "detailed"

[logging]
level = "debug"
format = "json"
file_path = "logs/neurocable.log"
"#,
    )
    .unwrap();

    let config = load_config(Some(&path), None).unwrap();
    assert_eq!(config.backend.gpu_alignment, 128);
    assert_eq!(config.backend.gpu_width_threshold, 50_000);
    assert_eq!(config.diagnostics.instantiation, "detailed");
    assert_eq!(config.logging.file_path.as_deref(), Some("logs/neurocable.log"));

    // Serialises back to an equivalent document
    let text = toml::to_string(&config).unwrap();
    let reparsed: NeurocableConfig = toml::from_str(&text).unwrap();
    assert_eq!(reparsed, config);
}

#[test]
fn test_missing_sections_use_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();
    let config = load_config(Some(&path), None).unwrap();
    assert_eq!(config.backend, NeurocableConfig::default().backend);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_cli_override_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "").unwrap();

    let mut cli = HashMap::new();
    cli.insert("diagnostics.instantiation".to_string(), "chatty".to_string());
    assert!(load_config(Some(&path), Some(&cli)).is_err());
}

#[test]
fn test_malformed_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[backend\nkind = ").unwrap();
    assert!(matches!(
        load_config(Some(&path), None),
        Err(ConfigError::ParseError(_))
    ));
}
