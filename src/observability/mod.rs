//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch and the server runner produce:
//!     → logging.rs (structured log events, request spans carry the request ID)
//!     → metrics.rs (request counters, latency histograms, failure counters)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint, when enabled
//! ```
//!
//! # Design Decisions
//! - Metric updates are no-ops until a recorder is installed
//! - Log filter comes from `RUST_LOG` first, then the configuration

pub mod logging;
pub mod metrics;
