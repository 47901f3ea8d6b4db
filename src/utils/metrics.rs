//! Observability and Metrics
//!
//! Counters for connection lifecycle and protocol selection.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

use crate::protocol::detector::ProtocolVariant;

/// Global metrics collector for the protocol switch
#[derive(Debug)]
pub struct Metrics {
    /// Total connections accepted
    pub connections_total: AtomicU64,
    /// Currently open connections
    pub connections_active: AtomicU64,
    /// Connections refused because the connection limit was reached
    pub connections_refused: AtomicU64,
    /// Connections classified as HTTP-like
    pub http_selected: AtomicU64,
    /// Connections classified as a magic byte stream
    pub magic_selected: AtomicU64,
    /// Connections falling through to the native protocol
    pub native_selected: AtomicU64,
    /// Connections closed because no protocol matched
    pub unrecognised: AtomicU64,
    /// Connections closed because their handler could not be built
    pub construction_failures: AtomicU64,
    /// Connections closed because their handler reported an error
    pub handler_errors: AtomicU64,
    /// Bytes forwarded to bound handlers
    pub bytes_forwarded: AtomicU64,
    /// Bytes written back to peers
    pub bytes_written: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            connections_refused: AtomicU64::new(0),
            http_selected: AtomicU64::new(0),
            magic_selected: AtomicU64::new(0),
            native_selected: AtomicU64::new(0),
            unrecognised: AtomicU64::new(0),
            construction_failures: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            bytes_forwarded: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new connection
    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a connection dropped at the connection limit
    pub fn connection_refused(&self) {
        self.connections_refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of classifying a connection
    pub fn protocol_selected(&self, variant: &ProtocolVariant) {
        let counter = match variant {
            ProtocolVariant::HttpLike => &self.http_selected,
            ProtocolVariant::MagicByteStream(_) => &self.magic_selected,
            ProtocolVariant::Native => &self.native_selected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection no protocol claimed
    pub fn protocol_unrecognised(&self) {
        self.unrecognised.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed handler construction
    pub fn construction_failed(&self) {
        self.construction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handler rejecting delivered bytes
    pub fn handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fragment forwarded to a bound handler
    pub fn fragment_forwarded(&self, byte_count: u64) {
        self.bytes_forwarded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record bytes flushed to a peer
    pub fn bytes_written(&self, byte_count: u64) {
        self.bytes_written.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_refused: self.connections_refused.load(Ordering::Relaxed),
            http_selected: self.http_selected.load(Ordering::Relaxed),
            magic_selected: self.magic_selected.load(Ordering::Relaxed),
            native_selected: self.native_selected.load(Ordering::Relaxed),
            unrecognised: self.unrecognised.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            bytes_forwarded: self.bytes_forwarded.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            connections_refused = snapshot.connections_refused,
            http_selected = snapshot.http_selected,
            magic_selected = snapshot.magic_selected,
            native_selected = snapshot.native_selected,
            unrecognised = snapshot.unrecognised,
            construction_failures = snapshot.construction_failures,
            handler_errors = snapshot.handler_errors,
            bytes_forwarded = snapshot.bytes_forwarded,
            bytes_written = snapshot.bytes_written,
            uptime_seconds = snapshot.uptime_seconds,
            "Protocol switch metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub connections_refused: u64,
    pub http_selected: u64,
    pub magic_selected: u64,
    pub native_selected: u64,
    pub unrecognised: u64,
    pub construction_failures: u64,
    pub handler_errors: u64,
    pub bytes_forwarded: u64,
    pub bytes_written: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_selection_per_variant() {
        let metrics = Metrics::new();
        metrics.protocol_selected(&ProtocolVariant::HttpLike);
        metrics.protocol_selected(&ProtocolVariant::Native);
        metrics.protocol_selected(&ProtocolVariant::Native);
        metrics.connection_established();
        metrics.connection_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.http_selected, 1);
        assert_eq!(snapshot.native_selected, 2);
        assert_eq!(snapshot.magic_selected, 0);
        assert_eq!(snapshot.connections_total, 1);
        assert_eq!(snapshot.connections_active, 0);
    }
}
