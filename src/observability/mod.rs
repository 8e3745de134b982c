//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate, middleware, sweeper, passthrough produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Routine rejections are debug/warn events, never errors
//! - The request id generated by the gate appears in passthrough logs
//! - Metric updates are atomic increments on the hot path

pub mod logging;
pub mod metrics;
