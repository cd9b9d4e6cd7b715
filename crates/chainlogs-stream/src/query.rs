//! Historical Query Engine.
//!
//! Fetches the logs matching a filter with a single `eth_getLogs` call and
//! decodes them against one interface schema. No pagination: when the node
//! refuses the range the caller gets [`QueryError::RangeTooLarge`] and is
//! expected to split the range itself.

use chainlogs_core::{
    error::{BatchDecodeError, QueryError},
    event::DecodedEvent,
    log::LogFilter,
    source::LogSource,
};
use chainlogs_evm::{DecodePolicy, InterfaceSchema, LogDecoder};
use chainlogs_observability::{ChainlogsMetrics, MetricSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::QueryConfig;

/// Decoded result of one historical query.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    /// Decoded events in node order (block ascending, log index ascending)
    pub events: Vec<DecodedEvent>,
    /// Logs that failed to decode under [`DecodePolicy::Skip`]. `index` is
    /// the log's position in the node's response.
    pub skipped: Vec<BatchDecodeError>,
    /// Logs dropped because the node flagged them as removed by a reorg
    pub removed: usize,
}

/// Runs historical queries against a [`LogSource`].
pub struct HistoricalQuery {
    source: Arc<dyn LogSource>,
    schema: Arc<InterfaceSchema>,
    decoder: LogDecoder,
    config: QueryConfig,
    metrics: Option<ChainlogsMetrics>,
}

impl HistoricalQuery {
    pub fn new(source: Arc<dyn LogSource>, schema: Arc<InterfaceSchema>) -> Self {
        Self {
            source,
            schema,
            decoder: LogDecoder::new(),
            config: QueryConfig::default(),
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.config.decode_policy = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: ChainlogsMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch and decode every log matching `filter`.
    pub async fn run(&self, filter: &LogFilter) -> Result<QueryOutcome, QueryError> {
        let from = filter.from_block.and_then(|b| b.as_number());
        let to = filter.to_block.and_then(|b| b.as_number());
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(QueryError::InvalidRange { from, to });
            }
        }

        let mut logs = self.source.get_logs(filter).await.map_err(|e| {
            warn!(error = %e, "eth_getLogs failed");
            QueryError::from(e)
        })?;
        if let Some(m) = &self.metrics {
            m.record_query(logs.len());
        }

        let positions: Vec<usize> = logs
            .iter()
            .enumerate()
            .filter(|(_, log)| !log.removed)
            .map(|(i, _)| i)
            .collect();
        let removed = logs.len() - positions.len();
        if removed > 0 {
            debug!(removed, "dropping logs removed by reorg");
            if let Some(m) = &self.metrics {
                m.record_skipped("removed", removed);
            }
            logs.retain(|log| !log.removed);
        }

        let original_index = |err: BatchDecodeError| BatchDecodeError {
            index: positions.get(err.index).copied().unwrap_or(err.index),
            source: err.source,
        };

        let batch = self
            .decoder
            .decode_batch(&self.schema, &logs, self.config.decode_policy)
            .map_err(|err| {
                if let Some(m) = &self.metrics {
                    m.record_error(&err.source, MetricSource::Query);
                }
                QueryError::from(original_index(err))
            })?;

        if let Some(m) = &self.metrics {
            for event in &batch.events {
                m.record_decoded(&event.name, MetricSource::Query);
            }
            for err in &batch.skipped {
                m.record_error(&err.source, MetricSource::Query);
            }
        }

        info!(
            logs = logs.len(),
            events = batch.events.len(),
            skipped = batch.skipped.len(),
            removed,
            "historical query complete"
        );

        Ok(QueryOutcome {
            events: batch.events,
            skipped: batch.skipped.into_iter().map(original_index).collect(),
            removed,
        })
    }
}
