//! Integration tests for configuration loading

use crm_export::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[site]
id = "test-site"

[server]
bind_address = "127.0.0.1"
port = 8088
max_body_bytes = 4096

[attestation]
authority_url = "http://authority.test/proofs"
timeout_ms = 750

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "test-site");
    assert_eq!(config.bind_address(), "127.0.0.1");
    assert_eq!(config.port(), 8088);
    assert_eq!(config.max_body_bytes(), 4096);
    assert_eq!(config.attestation_url(), Some("http://authority.test/proofs"));
    assert_eq!(config.attestation_timeout_ms(), 750);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_partial_config_uses_section_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server]\nport = 9000\n\n[attestation]\nauthority_url = \"  \"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.port(), 9000);
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.max_body_bytes(), 10 * 1024 * 1024);
    assert_eq!(config.attestation_url(), None);
    assert_eq!(config.site_id(), "crm");
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server\nport = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.port(), 3001);
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.attestation_url(), None);
    assert_eq!(config.attestation_timeout_ms(), 2000);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_repository_dev_config_parses() {
    let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml")).unwrap();
    assert_eq!(config.site_id(), "crm-dev");
    assert_eq!(config.port(), 3001);
    assert_eq!(config.attestation_url(), None);
}
