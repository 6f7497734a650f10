//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Capture / replay handlers produce:
//!     → logging.rs (structured log events, request-id correlated)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every log line of a request via the trace span
//! - Metrics are cheap (atomic increments) and no-ops until an exporter is
//!   installed

pub mod logging;
pub mod metrics;
