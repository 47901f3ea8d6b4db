//! # Native Protocol Framing
//!
//! Packet format and codec for the switch's own protocol, the one a connection
//! falls back to when it is neither HTTP-like nor a magic token.
//!
//! ## Components
//! - **Packet**: Binary packet with magic bytes, version and length prefix
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Magic(4)] [Version(1)] [Length(4)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Maximum packet size: 16MB (prevents memory exhaustion)
//! - Length validation before allocation

pub mod codec;
pub mod packet;
