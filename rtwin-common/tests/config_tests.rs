//! Integration tests for configuration loading and resolution
//!
//! Covers:
//! - Missing config file falls back to defaults (never fatal)
//! - Malformed config file is a Config error
//! - Resolution priority: CLI argument > RTWIN_CONFIG > platform default
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate RTWIN_CONFIG are marked with #[serial].

use rtwin_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use rtwin_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = TomlConfig::load(&path).unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.merge.similarity_threshold, 0.8);
    assert!(config.cache.dir.is_none());
}

#[test]
fn test_full_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[logging]
level = "debug"

[cache]
dir = "/var/cache/researchtwin"
affiliation_ttl_secs = 3600

[http]
timeout_secs = 5

[resolver]
max_dois = 4

[scoring]
fallback_type = "dataset"
max_repositories = 5

[scoring.field_medians]
dataset = 40.0
code = 8.0

[github]
token = "ghp_example"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.cache.dir,
        Some(PathBuf::from("/var/cache/researchtwin"))
    );
    assert_eq!(config.cache.affiliation_ttl_secs, 3600);
    // Unset TTLs keep their defaults
    assert_eq!(config.cache.geocode_ttl_secs, 30 * 86_400);
    assert_eq!(config.http.timeout_secs, 5);
    assert_eq!(config.resolver.max_dois, 4);
    assert_eq!(config.scoring.fallback_type, "dataset");
    assert_eq!(config.scoring.field_medians.get("dataset"), Some(&40.0));
    assert_eq!(config.github.token.as_deref(), Some("ghp_example"));
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[merge\nsimilarity_threshold = ").unwrap();

    let result = TomlConfig::load(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_var_used_without_cli_arg() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/rtwin-env-config.toml");

    let path = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_eq!(path, Some(PathBuf::from("/tmp/rtwin-env-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_arg_beats_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/rtwin-env-config.toml");

    let path = resolve_config_path(Some("/tmp/rtwin-cli-config.toml"), CONFIG_ENV_VAR);
    assert_eq!(path, Some(PathBuf::from("/tmp/rtwin-cli-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolve_and_load_through_env_var() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[resolver]\nmax_dois = 3\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = TomlConfig::resolve_and_load(None).unwrap();
    assert_eq!(config.resolver.max_dois, 3);

    env::remove_var(CONFIG_ENV_VAR);
}
