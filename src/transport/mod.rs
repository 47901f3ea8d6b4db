//! # Transport Layer
//!
//! The seam between sockets and the multiplexer.
//!
//! Handlers never touch a socket directly. They receive an
//! `Arc<dyn Transport>` when bound, and every write is queued to a writer task
//! so that delivering a fragment never blocks the connection's read loop.
//!
//! ## Components
//! - **Transport**: trait handed to handlers (`write`, `close`, `peer`)
//! - **ChannelTransport**: queued implementation drained by [`channel::run_writer`]
//! - **tcp**: accept loop, per-connection read loop and graceful shutdown

pub mod channel;
pub mod tcp;

pub use channel::{ChannelTransport, TransportCommand};

use crate::error::Result;
use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;

/// Identity of the remote end of a connection, used in every lifecycle log line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for PeerIdentity {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output side of a connection, shared by the multiplexer and the bound handler.
///
/// Implementations must not block: `write` and `close` are called from the
/// synchronous data-arrival path.
pub trait Transport: Send + Sync {
    /// Queue bytes for the peer
    fn write(&self, data: Bytes) -> Result<()>;

    /// Flush anything already queued, then terminate the connection.
    ///
    /// Calling `close` more than once has no further effect.
    fn close(&self);

    fn is_closed(&self) -> bool;

    fn peer(&self) -> &PeerIdentity;
}
