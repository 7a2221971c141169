//! Prometheus metrics infrastructure.
//!
//! Metric events are plain structs implementing [`events::InternalEvent`];
//! the recorder and its HTTP endpoint are process-wide singletons installed
//! once at startup.

pub mod events;
mod server;

pub use events::InternalEvent;
pub use server::{DEFAULT_METRICS_ADDR, MetricsController, init_global, init_test};

/// Emit a metric event through its [`InternalEvent`] implementation.
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        <_ as $crate::metrics::events::InternalEvent>::emit($event)
    };
}
