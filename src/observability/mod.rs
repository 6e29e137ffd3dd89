//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Lock-free counters
//!
//! Observability is read-only: it never changes the outcome of a request.
//!
//! # Usage
//!
//! ```ignore
//! use recordfinder::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::FindComplete, &[("model", "user"), ("records", "2")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.record_find(2);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a typed event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
