//! Metrics for the commit coordinator.
//!
//! Events here cover quorum progress, commit outcomes and checkpoint state.
//! The recorder and HTTP exporter live in `soulsink_core`.

pub mod events;

pub use events::*;

/// Macro for emitting coordinator metric events.
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        <_ as $crate::metrics::events::InternalEvent>::emit($event)
    };
}
