//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / store / http layers produce:
//!     → logging.rs (structured tracing events, request_id field)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber fmt layer
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request summaries log at info when `show_log` is on, debug otherwise
//! - Request ID from `x-request-id` flows into every request log line
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;
