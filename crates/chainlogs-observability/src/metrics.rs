//! ChainLogs metrics definitions.
//!
//! All metrics use OpenTelemetry conventions.
//! They can be exported to Prometheus, Grafana, Datadog, etc. by whatever
//! meter provider the application installs globally.

use chainlogs_core::error::DecodeError;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Which engine produced a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    Query,
    Subscription,
}

impl MetricSource {
    fn as_str(self) -> &'static str {
        match self {
            MetricSource::Query => "query",
            MetricSource::Subscription => "subscription",
        }
    }
}

/// Central metrics handle for ChainLogs.
#[derive(Clone)]
pub struct ChainlogsMetrics {
    pub events_decoded: Counter<u64>,
    pub decode_errors: Counter<u64>,
    pub logs_skipped: Counter<u64>,
    pub query_logs: Histogram<u64>,
}

impl ChainlogsMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            events_decoded: meter
                .u64_counter("chainlogs.events_decoded")
                .with_description("Total number of successfully decoded events")
                .build(),
            decode_errors: meter
                .u64_counter("chainlogs.decode_errors")
                .with_description("Logs that failed to decode")
                .build(),
            logs_skipped: meter
                .u64_counter("chainlogs.logs_skipped")
                .with_description("Logs dropped before decoding (reorged or filtered)")
                .build(),
            query_logs: meter
                .u64_histogram("chainlogs.query_logs")
                .with_description("Number of logs returned by one historical query")
                .build(),
        }
    }

    /// Instruments on the global meter provider.
    pub fn from_global() -> Self {
        Self::new(&global::meter("chainlogs"))
    }

    pub fn record_decoded(&self, event: &str, source: MetricSource) {
        self.events_decoded.add(
            1,
            &[
                KeyValue::new("event", event.to_string()),
                KeyValue::new("source", source.as_str()),
            ],
        );
    }

    pub fn record_error(&self, error: &DecodeError, source: MetricSource) {
        self.decode_errors.add(
            1,
            &[
                KeyValue::new("error_type", error.kind()),
                KeyValue::new("source", source.as_str()),
            ],
        );
    }

    pub fn record_skipped(&self, reason: &'static str, count: usize) {
        self.logs_skipped
            .add(count as u64, &[KeyValue::new("reason", reason)]);
    }

    pub fn record_query(&self, logs: usize) {
        self.query_logs.record(logs as u64, &[]);
    }
}

impl std::fmt::Debug for ChainlogsMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainlogsMetrics").finish_non_exhaustive()
    }
}
