//! # Protocol Handlers
//!
//! The protocols a connection can be switched to.
//!
//! These are deliberately thin: they exist so the switch is usable end to end,
//! not as full protocol implementations.
//!
//! ## Components
//! - **HttpHandler**: serves registry resources over a single HTTP/1.x request
//! - **ByteStreamHandler**: writes one resource verbatim, selected by its magic token
//! - **NativeHandler**: echoes native protocol packets

pub mod byte_stream;
pub mod http;
pub mod native;

pub use byte_stream::ByteStreamHandler;
pub use http::HttpHandler;
pub use native::NativeHandler;

use crate::error::{ProtocolError, Result};
use crate::transport::Transport;
use std::sync::Arc;

/// Borrow the bound transport or fail with a transport error
pub(crate) fn bound(transport: &Option<Arc<dyn Transport>>) -> Result<&Arc<dyn Transport>> {
    transport
        .as_ref()
        .ok_or_else(|| ProtocolError::TransportError("Handler is not bound".to_string()))
}
