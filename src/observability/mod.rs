//! Observability for the prescription service
//!
//! - Structured logging (JSON lines)
//! - Monotonic request counters
//!
//! ```ignore
//! use optica::observability::Logger;
//!
//! Logger::info("SERVER_STARTED", &[("addr", "0.0.0.0:5000")]);
//! ```

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
