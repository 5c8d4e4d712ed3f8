//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, and defaults for missing sections.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = SyncConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.activation.recent_activation_ms, 2000);
    assert_eq!(config.surface.granularity, 128);
    assert_eq!(config.frame.coordinate_limit, 16000);
    assert_eq!(config.frame.max_extent, 32000);
    assert!(config.decorations.enabled);
    assert_eq!((config.tracking.min_width, config.tracking.min_height), (112, 27));
    assert!(!config.general.debug);
}

#[test]
fn test_configuration_serialization_roundtrip() -> Result<()> {
    let original_config = SyncConfig::default();

    let toml_string = toml::to_string(&original_config)?;
    let deserialized_config: SyncConfig = toml::from_str(&toml_string)?;

    assert_eq!(original_config, deserialized_config);

    Ok(())
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("winsync.toml");

    let test_config = r#"
[activation]
recent_activation_ms = 500

[surface]
granularity = 64
max_bytes = 1048576

[frame]
coordinate_limit = 8000
max_extent = 16000

[decorations]
enabled = false
caption_height = 22
small_caption_height = 15
sizing_frame = 4
dialog_frame = 2
border = 1

[general]
debug = true
"#;

    fs::write(&file_path, test_config)?;

    let config = SyncConfig::load(&file_path)?;

    assert_eq!(config.activation.recent_activation_ms, 500);
    assert_eq!(config.surface.granularity, 64);
    assert_eq!(config.surface.max_bytes(), 1_048_576);
    assert_eq!(config.frame.coordinate_limit, 8000);
    assert!(!config.decorations.enabled);
    assert_eq!(config.decorations.caption_height, 22);
    assert!(config.general.debug);

    Ok(())
}

#[test]
fn test_missing_sections_use_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("partial.toml");

    fs::write(&file_path, "[surface]\ngranularity = 256\n")?;

    let config = SyncConfig::load(&file_path)?;

    assert_eq!(config.surface.granularity, 256);
    assert_eq!(config.surface.max_bytes, SurfaceConfig::default().max_bytes);
    assert_eq!(config.activation, ActivationConfig::default());
    assert_eq!(config.decorations, DecorationConfig::default());

    Ok(())
}

#[test]
fn test_invalid_granularity_rejected() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("bad.toml");

    fs::write(&file_path, "[surface]\ngranularity = 100\n")?;

    let err = SyncConfig::load(&file_path).unwrap_err();
    assert!(err.to_string().contains("granularity"));

    Ok(())
}

#[test]
fn test_negative_metric_rejected() {
    let mut config = SyncConfig::default();
    config.decorations.sizing_frame = -1;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("sizing_frame"));
}

#[test]
fn test_nonpositive_limits_rejected() {
    let mut config = SyncConfig::default();
    config.frame.coordinate_limit = 0;
    assert!(config.validate().is_err());

    let mut config = SyncConfig::default();
    config.frame.max_extent = -5;
    assert!(config.validate().is_err());

    let mut config = SyncConfig::default();
    config.surface.max_bytes = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_tracking_section() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("tracking.toml");

    fs::write(&file_path, "[tracking]\nmin_width = 200\n")?;
    let config = SyncConfig::load(&file_path)?;
    assert_eq!(config.tracking.min_width, 200);
    assert_eq!(config.tracking.min_height, 27);

    fs::write(&file_path, "[tracking]\nmin_height = -1\n")?;
    let err = SyncConfig::load(&file_path).unwrap_err();
    assert!(format!("{:#}", err).contains("tracking"));

    Ok(())
}

#[test]
fn test_missing_file_reports_path() {
    let err = SyncConfig::load("/nonexistent/winsync.toml").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/winsync.toml"));
}

#[test]
fn test_malformed_toml() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("broken.toml");

    fs::write(&file_path, "[surface\ngranularity = ")?;

    assert!(SyncConfig::load(&file_path).is_err());

    Ok(())
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut config = SyncConfig::default();
    config.activation.recent_activation_ms = 750;
    config.decorations.caption_height = 30;
    config.save(&file_path)?;

    let reloaded = SyncConfig::load(&file_path)?;
    assert_eq!(reloaded, config);

    Ok(())
}
