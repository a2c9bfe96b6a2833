use std::fs;
use std::path::PathBuf;

use chrono::FixedOffset;
use taskstore_core::config::{DEFAULT_CACHED_STATEMENTS, DEFAULT_FILENAME, DEFAULT_TABLE};
use taskstore_core::{StoreConfig, StoreError};

use crate::common::temp_dir;

fn write_config(prefix: &str, body: &str) -> PathBuf {
    let dir = temp_dir(prefix);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("store.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn defaults_are_sensible() {
    let config = StoreConfig::default();
    assert_eq!(config.location, PathBuf::from("."));
    assert_eq!(config.filename, DEFAULT_FILENAME);
    assert_eq!(config.cached_statements, DEFAULT_CACHED_STATEMENTS);
    assert_eq!(config.table_name(), DEFAULT_TABLE);
    assert_eq!(config.path(), PathBuf::from(".").join("tasks.db"));
    config.validate().unwrap();
}

#[test]
fn load_fills_missing_keys_with_defaults() {
    let path = write_config(
        "cfg_load",
        r#"{"location": "/var/lib/tasks", "session": "abc-123", "utc_offset_seconds": 3600}"#,
    );
    let config = StoreConfig::load(&path).unwrap();
    assert_eq!(config.location, PathBuf::from("/var/lib/tasks"));
    assert_eq!(config.filename, DEFAULT_FILENAME);
    assert_eq!(config.table_name(), "abc_123");
    assert_eq!(
        config.codec().unwrap().offset(),
        FixedOffset::east_opt(3600).unwrap()
    );
}

#[test]
fn load_rejects_unknown_keys_and_bad_json() {
    let path = write_config("cfg_unknown", r#"{"locaton": "/tmp"}"#);
    assert!(matches!(StoreConfig::load(&path), Err(StoreError::Config(_))));

    let path = write_config("cfg_bad", "{ not json");
    assert!(matches!(StoreConfig::load(&path), Err(StoreError::Config(_))));

    let missing = temp_dir("cfg_missing").join("absent.json");
    assert!(matches!(StoreConfig::load(&missing), Err(StoreError::Config(_))));
}

#[test]
fn env_vars_override_file_values() {
    let config = StoreConfig {
        table: Some("from_file".to_string()),
        ..StoreConfig::default()
    }
    .apply_vars([
        ("TASKSTORE_LOCATION", "/data"),
        ("TASKSTORE_FILENAME", "hub.db"),
        ("TASKSTORE_TABLE", "from_env"),
        ("TASKSTORE_UTC_OFFSET", "-18000"),
        ("UNRELATED", "ignored"),
    ])
    .unwrap();
    assert_eq!(config.path(), PathBuf::from("/data").join("hub.db"));
    assert_eq!(config.table_name(), "from_env");
    assert_eq!(config.utc_offset_seconds, Some(-18_000));
}

#[test]
fn malformed_offset_is_a_config_error() {
    let err = StoreConfig::default()
        .apply_vars([("TASKSTORE_UTC_OFFSET", "five hours")])
        .unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));

    let config = StoreConfig {
        utc_offset_seconds: Some(100_000),
        ..StoreConfig::default()
    };
    assert!(matches!(config.codec(), Err(StoreError::Config(_))));
    assert!(matches!(config.validate(), Err(StoreError::Config(_))));
}

#[test]
fn table_beats_session_and_empty_table_falls_through() {
    let mut config = StoreConfig {
        table: Some("explicit".to_string()),
        session: Some("9e7a.b".to_string()),
        ..StoreConfig::default()
    };
    assert_eq!(config.table_name(), "explicit");

    config.table = Some(String::new());
    assert_eq!(config.table_name(), "_9e7a_b");

    config.session = None;
    assert_eq!(config.table_name(), DEFAULT_TABLE);
}

#[test]
fn validate_rejects_empty_filename_and_zero_cache() {
    let config = StoreConfig {
        filename: "  ".to_string(),
        ..StoreConfig::default()
    };
    assert!(matches!(config.validate(), Err(StoreError::Config(_))));

    let config = StoreConfig {
        cached_statements: 0,
        ..StoreConfig::default()
    };
    assert!(matches!(config.validate(), Err(StoreError::Config(_))));
}
