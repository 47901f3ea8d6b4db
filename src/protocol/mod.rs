//! # Protocol Switching
//!
//! Classifies a connection from its first fragment and binds the matching handler.
//!
//! ## Components
//! - **Detector**: pure classification of a fragment into a [`ProtocolVariant`]
//! - **Handler**: the interface every protocol implementation exposes to the switch
//! - **Factory**: turns a variant into a bound-ready handler
//! - **Multiplexer**: the per-connection `Undetermined -> Bound` state machine
//!
//! ## Ordering
//! Detection runs exactly once per connection, before any handler exists, and
//! the fragment it inspected is replayed into the handler unchanged.
//!
//! [`ProtocolVariant`]: detector::ProtocolVariant

pub mod detector;
pub mod factory;
pub mod handler;
pub mod multiplexer;
