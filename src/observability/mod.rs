//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resolver, channel and pickers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Structured logging with key/value fields for machine parsing
//! - Metrics are cheap (no-op until a recorder is installed)
//! - Empty ready sets log at debug; they are a normal transient state

pub mod logging;
pub mod metrics;
