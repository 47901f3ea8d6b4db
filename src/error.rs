//! # Error Types
//!
//! Error handling for the protocol switch.
//!
//! The multiplexer itself only fails in two ways: the detector declines to
//! classify a connection, or the handler for the chosen protocol cannot be
//! built. Both are fatal to that connection. The remaining variants cover the
//! collaborators: configuration, the resource registry, the transport and the
//! bundled protocol handlers.
//!
//! ## Example Usage
//! ```rust
//! use protocol_switch::error::{ProtocolError, Result};
//! use tracing::error;
//!
//! fn require_path(path: &str) -> Result<()> {
//!     if path.starts_with('/') {
//!         Ok(())
//!     } else {
//!         Err(ProtocolError::ResourceError(format!("path must be absolute: {path}")))
//!     }
//! }
//!
//! if let Err(e) = require_path("index.html") {
//!     error!(error = %e, "Rejected resource");
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Connection lifecycle errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_NOT_OPENED: &str = "Data received before the connection was opened";

    /// Classification errors
    pub const ERR_NO_MATCHING_PROTOCOL: &str = "No protocol matched the initial fragment";

    /// Native framing errors
    pub const ERR_INVALID_HEADER: &str = "Invalid protocol header";
    pub const ERR_OVERSIZED_PACKET: &str = "Packet exceeds maximum size";

    /// Transport errors
    pub const ERR_TRANSPORT_CLOSED: &str = "Transport is closed";
}

// ProtocolError is the primary error type for all protocol switch operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No protocol matched the initial fragment")]
    NoMatchingProtocol,

    #[error("Handler construction failed: {0}")]
    HandlerConstruction(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Data received before the connection was opened")]
    NotOpened,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource error: {0}")]
    ResourceError(String),

    #[error("Invalid protocol header")]
    InvalidHeader,

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
