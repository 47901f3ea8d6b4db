//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use protocol_switch::config::{
    DetectionConfig, LoggingConfig, ResourceConfig, ServerConfig, SwitchConfig,
};
use protocol_switch::registry::ResourceRegistry;
use std::time::Duration;
use tracing::Level;

fn inline(path: &str, magic: Option<&str>) -> ResourceConfig {
    ResourceConfig {
        path: path.to_string(),
        file: None,
        content: Some("content".to_string()),
        magic: magic.map(str::to_string),
        reserved: false,
    }
}

#[test]
fn test_default_config_validates() {
    let config = SwitchConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert!(config.detection.enable_http);
    assert!(config.detection.enable_magics);
}

#[test]
fn test_invalid_server_address() {
    let mut config = SwitchConfig::default();
    config.server.address = "invalid_address".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Invalid server address")));
}

#[test]
fn test_empty_server_address() {
    let mut config = SwitchConfig::default();
    config.server.address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_zero_max_connections() {
    let mut config = SwitchConfig::default();
    config.server.max_connections = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Max connections must be greater than 0")));
}

#[test]
fn test_read_buffer_bounds() {
    let mut server = ServerConfig::default();
    server.read_buffer_size = 16;
    assert!(server.validate().iter().any(|e| e.contains("too small")));

    server.read_buffer_size = 4 * 1024 * 1024;
    assert!(server.validate().iter().any(|e| e.contains("too large")));
}

#[test]
fn test_shutdown_timeout_bounds() {
    let mut server = ServerConfig::default();
    server.shutdown_timeout = Duration::from_millis(10);
    assert!(server
        .validate()
        .iter()
        .any(|e| e.contains("Shutdown timeout too short")));

    server.shutdown_timeout = Duration::from_secs(120);
    assert!(server
        .validate()
        .iter()
        .any(|e| e.contains("Shutdown timeout too long")));
}

#[test]
fn test_duplicate_resource_path() {
    let mut config = SwitchConfig::default();
    config.resources.push(inline("/", None));

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Duplicate resource path")));
}

#[test]
fn test_duplicate_magic_token() {
    let mut config = SwitchConfig::default();
    config.resources.push(inline("/other", Some("I")));

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Duplicate magic token")));
}

#[test]
fn test_padded_magic_token() {
    let mut config = SwitchConfig::default();
    config.resources.push(inline("/other", Some(" X")));
    config.resources.push(inline("/vt", Some("Y\x0b")));

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("without surrounding whitespace") && e.contains("/vt")));
    assert!(errors
        .iter()
        .any(|e| e.contains("without surrounding whitespace") && e.contains("/other")));
}

#[test]
fn test_resource_source_rules() {
    let mut config = SwitchConfig::default();
    let mut both = inline("/both", None);
    both.file = Some("/tmp/whatever".into());
    let mut neither = inline("/neither", None);
    neither.content = None;
    config.resources.push(both);
    config.resources.push(neither);
    config.resources.push(inline("relative", None));

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("sets both file and content")));
    assert!(errors.iter().any(|e| e.contains("needs either file or content")));
    assert!(errors.iter().any(|e| e.contains("must start with '/'")));
}

#[test]
fn test_missing_resource_file() {
    let mut config = SwitchConfig::default();
    let mut entry = inline("/missing", None);
    entry.content = None;
    entry.file = Some("/no/such/file.bin".into());
    config.resources.push(entry);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Resource file does not exist")));
}

#[test]
fn test_logging_app_name() {
    let mut logging = LoggingConfig::default();
    logging.app_name = String::new();
    assert!(!logging.validate().is_empty());

    logging.app_name = "x".repeat(65);
    assert!(logging.validate().iter().any(|e| e.contains("too long")));
}

#[test]
fn test_validate_strict_collects_errors() {
    let mut config = SwitchConfig::default();
    config.server.address = String::new();
    config.server.max_connections = 0;

    let err = config.validate_strict().unwrap_err().to_string();
    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("cannot be empty"));
    assert!(err.contains("Max connections"));
}

#[test]
fn test_toml_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("switch.toml");

    let config = SwitchConfig::default_with_overrides(|config| {
        config.server.address = "0.0.0.0:31416".to_string();
        config.detection = DetectionConfig {
            enable_http: false,
            enable_magics: true,
        };
        config.logging.log_level = Level::DEBUG;
    });
    config.save_to_file(&path).unwrap();

    let loaded = SwitchConfig::from_file(&path).unwrap();
    assert_eq!(loaded.server.address, "0.0.0.0:31416");
    assert!(!loaded.detection.enable_http);
    assert_eq!(loaded.logging.log_level, Level::DEBUG);
    assert_eq!(loaded.resources, config.resources);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = SwitchConfig::from_toml(
        r#"
        [detection]
        enable_http = true
        enable_magics = false

        [[resources]]
        path = "/drozer.apk"
        content = "apk"
        magic = "APK"
        "#,
    )
    .unwrap();

    assert!(!config.detection.enable_magics);
    assert_eq!(config.server.address, ServerConfig::default().address);
    assert_eq!(config.resources.len(), 1);
    assert!(!config.resources[0].reserved);

    let registry = ResourceRegistry::from_config(&config.resources).unwrap();
    assert_eq!(registry.has_magic_token(b"APK").unwrap().path(), "/drozer.apk");
}

#[test]
fn test_resources_loaded_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("index.html");
    std::fs::write(&file, "<html>from disk</html>").unwrap();

    let toml = format!(
        "[[resources]]\npath = \"/\"\nfile = {:?}\nmagic = \"I\"\nreserved = true\n",
        file.display().to_string()
    );
    let config = SwitchConfig::from_toml(&toml).unwrap();
    assert!(config.validate().is_empty(), "{:?}", config.validate());

    let registry = ResourceRegistry::from_config(&config.resources).unwrap();
    assert_eq!(
        registry.resolve("/").unwrap().content().as_ref(),
        b"<html>from disk</html>"
    );
}

#[test]
fn test_invalid_toml() {
    assert!(SwitchConfig::from_toml("[server\naddress = 1").is_err());
    assert!(SwitchConfig::from_toml("[logging]\napp_name = \"a\"\nlog_level = \"loud\"\nlog_to_console = true\njson_format = false\n").is_err());
}

#[test]
fn test_example_config_parses() {
    let example = SwitchConfig::example_config();
    let parsed = SwitchConfig::from_toml(&example).unwrap();
    assert!(parsed.validate().is_empty());
}
