//! # Utility Modules
//!
//! Supporting utilities used throughout the switch.
//!
//! ## Components
//! - **Logging**: Structured logging setup from `LoggingConfig`
//! - **Metrics**: Thread-safe counters for accepted, classified and rejected connections

pub mod logging;
pub mod metrics;
