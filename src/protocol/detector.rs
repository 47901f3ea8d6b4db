use std::fmt;
use std::sync::Arc;

use crate::config::DetectionConfig;
use crate::registry::{trim_token, Resource, ResourceRegistry};

/// Request-line prefixes that select the HTTP-like handler
pub const HTTP_METHOD_PREFIXES: [&[u8]; 3] = [b"DELETE", b"GET", b"POST"];

/// The protocols a connection can be switched to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolVariant {
    /// Request/response text protocol
    HttpLike,
    /// Raw byte stream of the resource whose magic token was sent
    MagicByteStream(Arc<Resource>),
    /// The switch's own protocol, chosen when nothing else matches
    Native,
}

impl ProtocolVariant {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVariant::HttpLike => "http",
            ProtocolVariant::MagicByteStream(_) => "byte-stream",
            ProtocolVariant::Native => "native",
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVariant::MagicByteStream(resource) => {
                write!(f, "{} ({})", self.name(), resource.path())
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Decide which protocol `data` is speaking.
///
/// Rules are tried in order:
/// 1. with `enable_http`, an exact case-sensitive `DELETE`, `GET` or `POST` prefix
/// 2. with `enable_magics`, the fragment minus surrounding whitespace (space, `\t` to `\r`)
///    equals a registered magic token
/// 3. otherwise the native protocol
///
/// `data` is only inspected; the trimmed view never leaves this function.
pub fn classify(
    data: &[u8],
    enable_http: bool,
    enable_magics: bool,
    registry: &ResourceRegistry,
) -> Option<ProtocolVariant> {
    if enable_http
        && HTTP_METHOD_PREFIXES
            .iter()
            .any(|prefix| data.starts_with(prefix))
    {
        return Some(ProtocolVariant::HttpLike);
    }

    if enable_magics {
        if let Some(resource) = registry.has_magic_token(trim_token(data)) {
            return Some(ProtocolVariant::MagicByteStream(resource));
        }
    }

    Some(ProtocolVariant::Native)
}

/// Classification strategy used by the multiplexer.
///
/// Implementations must be synchronous and free of I/O; they run on the
/// connection's data-arrival path. Returning `None` rejects the connection.
pub trait Detector: Send + Sync {
    fn classify(&self, data: &[u8]) -> Option<ProtocolVariant>;
}

/// The standard rule set: HTTP verbs, then magic tokens, then native
#[derive(Debug, Clone)]
pub struct RuleDetector {
    detection: DetectionConfig,
    registry: Arc<ResourceRegistry>,
}

impl RuleDetector {
    pub fn new(detection: DetectionConfig, registry: Arc<ResourceRegistry>) -> Self {
        Self {
            detection,
            registry,
        }
    }

    pub fn detection(&self) -> DetectionConfig {
        self.detection
    }
}

impl Detector for RuleDetector {
    fn classify(&self, data: &[u8]) -> Option<ProtocolVariant> {
        classify(
            data,
            self.detection.enable_http,
            self.detection.enable_magics,
            &self.registry,
        )
    }
}
