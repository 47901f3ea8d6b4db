use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{ProtocolError, Result};
use crate::protocol::detector::Detector;
use crate::protocol::factory::HandlerFactory;
use crate::protocol::handler::Handler;
use crate::transport::{PeerIdentity, Transport};
use crate::utils::metrics::global_metrics;

/// Where a connection is in its protocol lifecycle
pub enum ConnectionState {
    /// No fragment has been classified yet
    Undetermined,
    /// A handler owns the connection for the rest of its life
    Bound(Box<dyn Handler>),
    /// The transport closed or the connection was rejected; the handler is released
    Closed,
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Undetermined => f.write_str("Undetermined"),
            ConnectionState::Bound(handler) => write!(f, "Bound({})", handler.name()),
            ConnectionState::Closed => f.write_str("Closed"),
        }
    }
}

/// Per-connection protocol switch.
///
/// The first fragment passed to [`on_data`](Self::on_data) is classified, a
/// handler is built and bound, and the same fragment is replayed into it.
/// Every later fragment goes straight to that handler. Calls must be
/// serialized by the owner; the read loop in `transport::tcp` does this by
/// owning the multiplexer.
pub struct Multiplexer {
    detector: Arc<dyn Detector>,
    factory: Arc<dyn HandlerFactory>,
    transport: Option<Arc<dyn Transport>>,
    peer: Option<PeerIdentity>,
    state: ConnectionState,
}

impl Multiplexer {
    pub fn new(detector: Arc<dyn Detector>, factory: Arc<dyn HandlerFactory>) -> Self {
        Self {
            detector,
            factory,
            transport: None,
            peer: None,
            state: ConnectionState::Undetermined,
        }
    }

    /// Attach the connection's transport. No protocol is selected yet.
    pub fn on_open(&mut self, transport: Arc<dyn Transport>, peer: PeerIdentity) {
        info!(peer = %peer, "Accepted incoming connection");
        self.transport = Some(transport);
        self.peer = Some(peer);
    }

    /// Feed the next fragment received from the peer.
    pub fn on_data(&mut self, data: &[u8]) -> Result<()> {
        match self.state {
            ConnectionState::Undetermined => self.switch_protocol(data),
            ConnectionState::Bound(_) => self.forward(data),
            ConnectionState::Closed => {
                debug!(peer = ?self.peer, bytes = data.len(), "Dropping data for closed connection");
                Err(ProtocolError::ConnectionClosed)
            }
        }
    }

    /// The transport has gone away: release the handler and stop forwarding.
    pub fn on_close(&mut self) {
        if matches!(self.state, ConnectionState::Closed) && self.transport.is_none() {
            return;
        }

        if let Some(ref peer) = self.peer {
            info!(peer = %peer, protocol = self.protocol().unwrap_or("none"), "Connection closed");
        }
        self.release();
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, ConnectionState::Bound(_))
    }

    /// Name of the bound handler, if any
    pub fn protocol(&self) -> Option<&'static str> {
        match self.state {
            ConnectionState::Bound(ref handler) => Some(handler.name()),
            _ => None,
        }
    }

    pub fn peer(&self) -> Option<&PeerIdentity> {
        self.peer.as_ref()
    }

    fn switch_protocol(&mut self, data: &[u8]) -> Result<()> {
        let (transport, peer) = match (&self.transport, &self.peer) {
            (Some(transport), Some(peer)) => (Arc::clone(transport), peer.clone()),
            _ => return Err(ProtocolError::NotOpened),
        };

        let Some(variant) = self.detector.classify(data) else {
            error!(peer = %peer, "Unrecognised protocol, closing connection");
            global_metrics().protocol_unrecognised();
            self.reject(&transport);
            return Err(ProtocolError::NoMatchingProtocol);
        };
        global_metrics().protocol_selected(&variant);

        let mut handler = match self.factory.build(&variant) {
            Ok(handler) => handler,
            Err(e) => {
                error!(peer = %peer, protocol = %variant, error = %e, "Failed to build protocol handler");
                global_metrics().construction_failed();
                self.reject(&transport);
                return Err(match e {
                    ProtocolError::HandlerConstruction(_) => e,
                    other => ProtocolError::HandlerConstruction(other.to_string()),
                });
            }
        };

        info!(peer = %peer, protocol = handler.name(), variant = %variant, "Switching protocol");
        handler.bind(transport);
        self.state = ConnectionState::Bound(handler);

        // Replay the fragment that was just classified
        self.forward(data)
    }

    fn forward(&mut self, data: &[u8]) -> Result<()> {
        let ConnectionState::Bound(ref mut handler) = self.state else {
            return Err(ProtocolError::ConnectionClosed);
        };

        match handler.deliver(data) {
            Ok(()) => {
                global_metrics().fragment_forwarded(data.len() as u64);
                Ok(())
            }
            Err(e) => {
                warn!(peer = ?self.peer, protocol = handler.name(), error = %e, "Handler rejected data, closing connection");
                global_metrics().handler_error();
                if let Some(transport) = self.transport.clone() {
                    self.reject(&transport);
                }
                Err(e)
            }
        }
    }

    fn reject(&mut self, transport: &Arc<dyn Transport>) {
        transport.close();
        self.release();
    }

    fn release(&mut self) {
        self.state = ConnectionState::Closed;
        self.transport = None;
    }
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .finish()
    }
}
