//! # chainlogs-observability
//!
//! OpenTelemetry-based observability for ChainLogs.
//!
//! ## Built-in metrics
//! - `chainlogs.events_decoded` counter, tagged with event + source
//! - `chainlogs.decode_errors`  counter, tagged with error_type + source
//! - `chainlogs.logs_skipped`   counter, tagged with reason
//! - `chainlogs.query_logs`     histogram of logs returned per historical query
//!
//! Instruments are created on the global meter provider, which is a no-op
//! until the host application installs an exporter.
//!
//! ## Structured logging
//! Text or JSON logs through `tracing-subscriber`, with levels configurable
//! per component.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::{ChainlogsMetrics, MetricSource};
pub use tracing_setup::{init_tracing, LogConfig};
