use super::*;
use std::time::Duration;

#[test]
fn full_config_parses() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "binary = \"/opt/qwen/bin/qwen\"\n\
         model = \"qwen3-coder\"\n\
         timeout_ms = 45000\n\
         max_attempts = 5\n\
         retry_delay_ms = 250\n",
    )
    .expect("write config");

    let config = Config::load_from_path(&path).expect("load");

    assert_eq!(config.binary.as_deref(), Some("/opt/qwen/bin/qwen"));
    assert_eq!(config.model.as_deref(), Some("qwen3-coder"));
    assert_eq!(config.timeout_ms, Some(45_000));
    assert_eq!(config.max_attempts, Some(5));
    assert_eq!(config.retry_delay_ms, Some(250));
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_from_path(&dir.path().join("nope.toml")).expect("load");
    assert!(config.binary.is_none());
    assert!(config.timeout_ms.is_none());
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "timeout_ms = [not numbers").expect("write config");

    let err = Config::load_from_path(&path).expect_err("parse should fail");
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn client_config_applies_overrides_and_clamps() {
    let config = Config {
        binary: Some("qwen-beta".to_string()),
        model: None,
        timeout_ms: Some(0),
        max_attempts: Some(0),
        retry_delay_ms: Some(10),
    };

    let resolved = config.client_config(Some("sk-test".to_string()));

    assert_eq!(resolved.binary, "qwen-beta");
    assert_eq!(resolved.model, crate::core::constants::DEFAULT_MODEL);
    assert_eq!(resolved.timeout, Duration::from_millis(1));
    assert_eq!(resolved.max_attempts, 1);
    assert_eq!(resolved.retry_delay, Duration::from_millis(10));
    assert_eq!(resolved.api_key.as_deref(), Some("sk-test"));
}
