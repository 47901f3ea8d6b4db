use std::sync::Arc;

use crate::error::Result;
use crate::transport::Transport;

/// A protocol implementation the multiplexer can hand a connection to.
///
/// The multiplexer calls `bind` exactly once, before the first `deliver`. The
/// first delivered fragment is the one used for classification, byte for byte.
/// Fragment boundaries follow the socket, not the protocol's framing, so
/// handlers buffer as needed.
pub trait Handler: Send {
    /// Stable identifier used in log lines
    fn name(&self) -> &'static str;

    /// Take over output for the connection
    fn bind(&mut self, transport: Arc<dyn Transport>);

    /// Receive the next fragment from the peer.
    ///
    /// An error is fatal to the connection: the multiplexer closes the
    /// transport and stops delivering.
    fn deliver(&mut self, data: &[u8]) -> Result<()>;
}
