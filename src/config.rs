//! # Configuration Management
//!
//! Centralized configuration for the protocol switch.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Sections
//! - `server`: listen address, connection limit, read buffer and shutdown grace
//! - `detection`: the two feature switches consulted by the detector
//! - `resources`: entries loaded into the resource registry at startup
//! - `logging`: subscriber settings used by `utils::logging`

use crate::error::{ProtocolError, Result};
use crate::registry::trim_token;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Current native protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Magic bytes that open every native protocol packet ("PSWT")
pub const MAGIC_BYTES: [u8; 4] = [0x50, 0x53, 0x57, 0x54];

/// Max allowed native payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Page served for `/` and `/index.html` when no resources are configured
pub const DEFAULT_INDEX_HTML: &str = "<!DOCTYPE html>\n<html>\n<head><title>protocol-switch</title></head>\n<body><p>protocol-switch is running.</p></body>\n</html>\n";

/// Magic token bound to `/` by default
pub const DEFAULT_MAGIC: &str = "I";

/// Default size of the per-connection read buffer
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwitchConfig {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Protocol detection switches
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Resources published through the registry
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            detection: DetectionConfig::default(),
            resources: default_resources(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_resources() -> Vec<ResourceConfig> {
    vec![
        ResourceConfig {
            path: String::from("/"),
            file: None,
            content: Some(String::from(DEFAULT_INDEX_HTML)),
            magic: Some(String::from(DEFAULT_MAGIC)),
            reserved: true,
        },
        ResourceConfig {
            path: String::from("/index.html"),
            file: None,
            content: Some(String::from(DEFAULT_INDEX_HTML)),
            magic: None,
            reserved: true,
        },
    ]
}

impl SwitchConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("PROTOCOL_SWITCH_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(limit) = std::env::var("PROTOCOL_SWITCH_MAX_CONNECTIONS") {
            if let Ok(val) = limit.parse::<usize>() {
                config.server.max_connections = val;
            }
        }

        if let Ok(flag) = std::env::var("PROTOCOL_SWITCH_ENABLE_HTTP") {
            config.detection.enable_http = parse_flag(&flag)?;
        }

        if let Ok(flag) = std::env::var("PROTOCOL_SWITCH_ENABLE_MAGICS") {
            config.detection.enable_magics = parse_flag(&flag)?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(validate_resources(&self.resources));
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProtocolError::ConfigError(format!(
            "Invalid boolean value: '{other}'"
        ))),
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "127.0.0.1:31415")
    pub address: String,

    /// Maximum number of concurrent connections
    pub max_connections: usize,

    /// Size of the buffer each connection reads into
    pub read_buffer_size: usize,

    /// How long shutdown waits for open connections to finish
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:31415"),
            max_connections: 1000,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:31415')",
                self.address
            ));
        }

        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        } else if self.max_connections > 100_000 {
            errors.push(format!(
                "Max connections very high: {} (ensure system resources can support this)",
                self.max_connections
            ));
        }

        if self.read_buffer_size < 512 {
            errors.push("Read buffer size too small (minimum: 512 bytes)".to_string());
        } else if self.read_buffer_size > 1024 * 1024 {
            errors.push("Read buffer size too large (maximum: 1 MB)".to_string());
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Switches consulted by the protocol detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Route fragments starting with an HTTP verb to the HTTP handler
    pub enable_http: bool,

    /// Route fragments equal to a magic token to the byte-stream handler
    pub enable_magics: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enable_http: true,
            enable_magics: true,
        }
    }
}

/// A single registry entry
///
/// Content comes either from `file`, read once at startup, or inline from `content`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Logical path, must start with `/`
    pub path: String,

    /// File to load the resource content from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Inline content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Magic token that selects this resource over the byte-stream protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magic: Option<String>,

    /// Reserved resources cannot be replaced or removed over HTTP
    #[serde(default)]
    pub reserved: bool,
}

fn validate_resources(resources: &[ResourceConfig]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut paths = HashSet::new();
    let mut magics = HashSet::new();

    for resource in resources {
        if !resource.path.starts_with('/') {
            errors.push(format!(
                "Resource path must start with '/': '{}'",
                resource.path
            ));
        }

        if !paths.insert(resource.path.as_str()) {
            errors.push(format!("Duplicate resource path: '{}'", resource.path));
        }

        match (&resource.file, &resource.content) {
            (Some(_), Some(_)) => errors.push(format!(
                "Resource '{}' sets both file and content",
                resource.path
            )),
            (None, None) => errors.push(format!(
                "Resource '{}' needs either file or content",
                resource.path
            )),
            (Some(file), None) if !file.exists() => errors.push(format!(
                "Resource file does not exist: {}",
                file.display()
            )),
            _ => {}
        }

        if let Some(ref magic) = resource.magic {
            if magic.is_empty() || trim_token(magic.as_bytes()) != magic.as_bytes() {
                errors.push(format!(
                    "Magic token for '{}' must be non-empty without surrounding whitespace",
                    resource.path
                ));
            } else if !magics.insert(magic.as_str()) {
                errors.push(format!("Duplicate magic token: '{magic}'"));
            }
        }
    }

    errors
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("protocol-switch"),
            log_level: Level::INFO,
            log_to_console: true,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true").unwrap());
        assert!(parse_flag(" ON ").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_default_resources_publish_index_magic() {
        let resources = default_resources();
        let root = resources.iter().find(|r| r.path == "/").unwrap();
        assert_eq!(root.magic.as_deref(), Some(DEFAULT_MAGIC));
        assert!(root.reserved);
        assert!(validate_resources(&resources).is_empty());
    }
}
