//! Integration test: configuration files

use kolosal_outliers::prelude::*;
use std::io::Write;

#[test]
fn test_config_save_load_roundtrip() {
    let tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
    let config = PipelineConfig::dns().with_random_state(7).with_normalize_numeric(true);

    config.save(tmp.path()).unwrap();
    let loaded = PipelineConfig::load(tmp.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_rejects_invalid_values() {
    let tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
    writeln!(
        tmp.as_file(),
        r#"{{"feature_fields": ["query"], "contamination": 1.5}}"#
    )
    .unwrap();
    tmp.as_file().flush().unwrap();

    let err = PipelineConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, KolosalError::ConfigError(_)));
}

#[test]
fn test_load_reports_malformed_json() {
    let tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
    writeln!(tmp.as_file(), "not json").unwrap();
    tmp.as_file().flush().unwrap();

    assert!(matches!(
        PipelineConfig::load(tmp.path()),
        Err(KolosalError::SerializationError(_))
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        PipelineConfig::load(dir.path().join("absent.json")),
        Err(KolosalError::IoError(_))
    ));
}
