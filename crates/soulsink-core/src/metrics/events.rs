//! Internal events for storage-level metrics.
//!
//! Each struct is one measurable occurrence; `emit()` records the
//! corresponding Prometheus metric and a trace line.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted after a directory listing completes.
pub struct DirectoryListed {
    /// Backend label, e.g. "local" or "object_store".
    pub backend: &'static str,
    /// Number of entries returned.
    pub entries: usize,
    pub duration: Duration,
}

impl InternalEvent for DirectoryListed {
    fn emit(self) {
        trace!(
            backend = self.backend,
            entries = self.entries,
            duration_ms = self.duration.as_millis(),
            "Directory listed"
        );
        counter!("soulsink_directory_listings_total", "backend" => self.backend).increment(1);
        histogram!("soulsink_directory_listing_duration_seconds", "backend" => self.backend)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when a listing fails.
pub struct DirectoryListingFailed {
    pub backend: &'static str,
}

impl InternalEvent for DirectoryListingFailed {
    fn emit(self) {
        trace!(backend = self.backend, "Directory listing failed");
        counter!("soulsink_directory_listing_errors_total", "backend" => self.backend)
            .increment(1);
    }
}
