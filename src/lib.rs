//! # protocol-switch
//!
//! Single-port protocol demultiplexer.
//!
//! A listener accepts connections without knowing which protocol the peer
//! speaks. The first fragment of bytes is classified once, a handler for the
//! detected protocol is built and bound to the connection, the fragment is
//! replayed into it, and every later fragment is forwarded untouched.
//!
//! ## Layout
//! - [`protocol`]: detector, handler factory and the per-connection multiplexer
//! - [`registry`]: read-only path and magic-token lookup shared by all connections
//! - [`handlers`]: the HTTP-like, magic byte-stream and native protocol handlers
//! - [`core`]: native protocol packet format and codec
//! - [`transport`]: TCP accept loop and the queued transport handed to handlers
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging and metrics
//!
//! ## Example
//! ```rust,no_run
//! use protocol_switch::config::SwitchConfig;
//! use protocol_switch::registry::ResourceRegistry;
//! use protocol_switch::transport::tcp;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> protocol_switch::error::Result<()> {
//!     let config = SwitchConfig::default();
//!     protocol_switch::utils::logging::init_logging(&config.logging)?;
//!     let registry = Arc::new(ResourceRegistry::from_config(&config.resources)?);
//!     tcp::start_server(config, registry).await
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod utils;

pub use crate::core::packet::Packet;
pub use error::{ProtocolError, Result};
pub use protocol::detector::{classify, Detector, ProtocolVariant, RuleDetector};
pub use protocol::factory::{DefaultHandlerFactory, HandlerFactory};
pub use protocol::handler::Handler;
pub use protocol::multiplexer::{ConnectionState, Multiplexer};
pub use registry::{Resource, ResourceRegistry};
pub use transport::{PeerIdentity, Transport};
