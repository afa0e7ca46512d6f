//! Metrics for request lifecycle and disclosure events
//!
//! Counters are recorded through the `metrics` facade; nothing is collected
//! unless a recorder is installed (see [`install_prometheus_exporter`]).

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

mod exporter;

pub use exporter::{install_prometheus_exporter, MetricsExporterError};

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    // Request lifecycle
    describe_counter!("requests.created", "Number of requests created by senders");
    describe_counter!("requests.accepted", "Number of accept transitions applied");
    describe_counter!("requests.denied", "Number of deny transitions applied");

    // Disclosure links
    describe_counter!("disclosure.links.set", "Number of links set or overwritten by receivers");
    describe_counter!(
        "disclosure.links.cleared",
        "Number of links cleared, by explicit unlink or by a deny cascade"
    );

    // Access guard
    describe_counter!(
        "access.denied",
        "Operations rejected by the access guard, labeled by reason (unauthenticated, not_found, forbidden)"
    );

    // Storage
    describe_histogram!("store.operation.duration_ms", "Store operation duration in milliseconds");
}

/// Record a request creation
pub fn request_created() {
    counter!("requests.created").increment(1);
}

/// Record an accept transition
pub fn request_accepted() {
    counter!("requests.accepted").increment(1);
}

/// Record a deny transition and the links it wiped
pub fn request_denied(links_cleared: usize) {
    counter!("requests.denied").increment(1);
    if links_cleared > 0 {
        counter!("disclosure.links.cleared").increment(links_cleared as u64);
    }
}

/// Record a link being set
pub fn link_set() {
    counter!("disclosure.links.set").increment(1);
}

/// Record an explicit unlink
pub fn link_cleared() {
    counter!("disclosure.links.cleared").increment(1);
}

/// Record an access guard rejection
pub fn access_denied(reason: &'static str) {
    counter!("access.denied", "reason" => reason).increment(1);
}

/// Timer for measuring operation duration
pub struct Timer {
    operation: &'static str,
    start: Instant,
}

impl Timer {
    /// Start timing a store operation
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!("store.operation.duration_ms", "operation" => self.operation)
            .record(duration.as_secs_f64() * 1000.0);
    }
}
