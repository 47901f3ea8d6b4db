//! # Resource Registry
//!
//! Read-only lookup from logical path, and from magic token, to a [`Resource`].
//!
//! The registry is assembled once before the listener starts and then shared
//! as `Arc<ResourceRegistry>` by every connection. Nothing mutates it after
//! [`RegistryBuilder::build`], so concurrent readers need no locking.

mod resource;

pub use resource::Resource;

use crate::config::ResourceConfig;
use crate::error::{ProtocolError, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Whitespace stripped around a fragment before it is compared to a magic
/// token: space, `\t`, `\n`, vertical tab, form feed and `\r`
pub fn is_token_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t'..=b'\r')
}

/// Strip [token whitespace](is_token_whitespace) from both ends of `data`
pub fn trim_token(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|&b| !is_token_whitespace(b))
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|&b| !is_token_whitespace(b))
        .map_or(start, |i| i + 1);
    &data[start..end]
}

/// Immutable path and magic-token index over the published resources
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    by_path: HashMap<String, Arc<Resource>>,
    by_magic: HashMap<Box<[u8]>, Arc<Resource>>,
}

impl ResourceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build a registry from configuration entries, reading any referenced files now.
    pub fn from_config(resources: &[ResourceConfig]) -> Result<Self> {
        let mut builder = Self::builder();

        for entry in resources {
            let content = match (&entry.file, &entry.content) {
                (Some(file), None) => Bytes::from(std::fs::read(file).map_err(|e| {
                    ProtocolError::ResourceError(format!(
                        "Failed to read {} for '{}': {e}",
                        file.display(),
                        entry.path
                    ))
                })?),
                (None, Some(content)) => Bytes::from(content.clone()),
                _ => {
                    return Err(ProtocolError::ResourceError(format!(
                        "Resource '{}' needs exactly one of file or content",
                        entry.path
                    )))
                }
            };

            let mut resource = Resource::new(entry.path.clone(), content).reserved(entry.reserved);
            if let Some(ref magic) = entry.magic {
                resource = resource.with_magic(magic.clone());
            }
            builder = builder.add(resource)?;
        }

        let registry = builder.build();
        info!(
            resources = registry.len(),
            magics = registry.by_magic.len(),
            "Resource registry built"
        );
        Ok(registry)
    }

    /// Look up a resource by logical path
    pub fn resolve(&self, path: &str) -> Option<Arc<Resource>> {
        self.by_path.get(path).cloned()
    }

    /// Look up a resource by magic token.
    ///
    /// The token is compared byte-for-byte; callers trim it with [`trim_token`].
    pub fn has_magic_token(&self, token: &[u8]) -> Option<Arc<Resource>> {
        self.by_magic.get(token).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Registered paths in sorted order
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.by_path.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

/// Collects resources and checks them for conflicts before the registry is frozen
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: ResourceRegistry,
}

impl RegistryBuilder {
    pub fn add(mut self, resource: Resource) -> Result<Self> {
        if !resource.path().starts_with('/') {
            return Err(ProtocolError::ResourceError(format!(
                "Resource path must start with '/': '{}'",
                resource.path()
            )));
        }

        if self.registry.by_path.contains_key(resource.path()) {
            return Err(ProtocolError::ResourceError(format!(
                "Duplicate resource path: '{}'",
                resource.path()
            )));
        }

        let resource = Arc::new(resource);

        if let Some(magic) = resource.magic() {
            // Lookups use the trimmed fragment, so a padded token could never match
            if magic.is_empty() || trim_token(magic.as_bytes()) != magic.as_bytes() {
                return Err(ProtocolError::ResourceError(format!(
                    "Invalid magic token for '{}': {magic:?}",
                    resource.path()
                )));
            }

            let key: Box<[u8]> = magic.as_bytes().into();
            if self.registry.by_magic.contains_key(&key) {
                return Err(ProtocolError::ResourceError(format!(
                    "Duplicate magic token: {magic:?}"
                )));
            }
            self.registry.by_magic.insert(key, Arc::clone(&resource));
        }

        debug!(path = resource.path(), magic = ?resource.magic(), "Registered resource");
        self.registry
            .by_path
            .insert(resource.path().to_string(), resource);
        Ok(self)
    }

    pub fn build(self) -> ResourceRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::SwitchConfig;

    #[test]
    fn test_resolve_and_magic_lookup() {
        let registry = ResourceRegistry::builder()
            .add(Resource::new("/", "index").with_magic("I").reserved(true))
            .unwrap()
            .add(Resource::new("/agent.apk", vec![0x50, 0x4B]))
            .unwrap()
            .build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("/agent.apk").unwrap().content().as_ref(), b"PK");
        assert!(registry.resolve("/missing").is_none());

        let root = registry.has_magic_token(b"I").unwrap();
        assert_eq!(root.path(), "/");
        assert!(registry.has_magic_token(b"I\n").is_none());
        assert!(registry.has_magic_token(b"i").is_none());
    }

    #[test]
    fn test_rejects_conflicts() {
        let builder = ResourceRegistry::builder()
            .add(Resource::new("/a", "").with_magic("X"))
            .unwrap();

        assert!(matches!(
            builder.add(Resource::new("/a", "")),
            Err(ProtocolError::ResourceError(_))
        ));

        let builder = ResourceRegistry::builder()
            .add(Resource::new("/a", "").with_magic("X"))
            .unwrap();
        assert!(builder.add(Resource::new("/b", "").with_magic("X")).is_err());

        assert!(ResourceRegistry::builder()
            .add(Resource::new("relative", ""))
            .is_err());
        assert!(ResourceRegistry::builder()
            .add(Resource::new("/c", "").with_magic(" X "))
            .is_err());
        assert!(ResourceRegistry::builder()
            .add(Resource::new("/c", "").with_magic(""))
            .is_err());
        assert!(ResourceRegistry::builder()
            .add(Resource::new("/c", "").with_magic("X\x0b"))
            .is_err());
    }

    #[test]
    fn test_trim_token() {
        assert_eq!(trim_token(b" \tI\r\n"), b"I");
        assert_eq!(trim_token(b"\x0bI\x0c"), b"I");
        assert_eq!(trim_token(b"I I"), b"I I");
        assert_eq!(trim_token(b"\x0b\n "), b"");
        assert_eq!(trim_token(b""), b"");
        // Only the ASCII set is stripped
        assert_eq!(trim_token(b"\x00I"), b"\x00I");
    }

    #[test]
    fn test_from_default_config() {
        let config = SwitchConfig::default();
        let registry = ResourceRegistry::from_config(&config.resources).unwrap();

        assert_eq!(registry.paths(), vec!["/", "/index.html"]);
        assert!(registry.resolve("/index.html").unwrap().is_reserved());
        assert_eq!(registry.has_magic_token(b"I").unwrap().path(), "/");
    }

    #[test]
    fn test_from_config_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("payload.bin");
        std::fs::write(&file, [1u8, 2, 3]).unwrap();

        let entries = vec![ResourceConfig {
            path: "/payload.bin".to_string(),
            file: Some(file),
            content: None,
            magic: Some("P".to_string()),
            reserved: false,
        }];

        let registry = ResourceRegistry::from_config(&entries).unwrap();
        assert_eq!(
            registry.has_magic_token(b"P").unwrap().content().as_ref(),
            &[1, 2, 3]
        );
    }

    #[test]
    fn test_from_config_missing_file() {
        let entries = vec![ResourceConfig {
            path: "/gone".to_string(),
            file: Some("/definitely/not/here".into()),
            content: None,
            magic: None,
            reserved: false,
        }];

        assert!(matches!(
            ResourceRegistry::from_config(&entries),
            Err(ProtocolError::ResourceError(_))
        ));
    }
}
