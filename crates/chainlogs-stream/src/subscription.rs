//! Live Subscription Engine.
//!
//! [`LiveSubscriber::subscribe`] opens a raw log stream through a
//! [`LogSubscriber`] and spawns one task that decodes every log and forwards
//! the result to a [`SubscriptionHandle`].
//!
//! State machine of a handle:
//!
//! ```text
//! Active ──unsubscribe / canceller / drop──▶ Closed
//!   │
//!   └──transport error / end of stream────▶ Failed(error)
//! ```
//!
//! Terminal states never change again and deliver nothing further. After
//! cancellation every pending or later `next()` returns `None`; after a
//! failure the buffered items are still delivered, then one
//! [`SubscriptionItem::Terminated`], then `None`.

use chainlogs_core::{
    error::{DecodeError, StreamError},
    event::DecodedEvent,
    log::{LogFilter, LogRecord},
    source::{LogSubscriber, RawLogStream},
};
use chainlogs_evm::{InterfaceSchema, LogDecoder};
use chainlogs_observability::{ChainlogsMetrics, MetricSource};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DecodeFailurePolicy, SubscriptionConfig};

/// One item delivered by a live subscription.
#[derive(Debug, Clone)]
pub enum SubscriptionItem {
    Event(DecodedEvent),
    /// A single log could not be decoded; the subscription stays active.
    DecodeFailed { log: LogRecord, error: DecodeError },
    /// The subscription failed. Always the last item.
    Terminated(StreamError),
}

/// Lifecycle state of a subscription.
#[derive(Debug, Clone)]
pub enum SubscriptionState {
    Active,
    /// Cancelled by the consumer.
    Closed,
    /// Ended by a transport failure (or a decode failure under
    /// [`DecodeFailurePolicy::Terminate`]).
    Failed(StreamError),
}

impl SubscriptionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionState::Active)
    }
}

/// Move `state` out of `Active`; terminal states are never overwritten.
fn transition(state: &watch::Sender<SubscriptionState>, next: SubscriptionState) -> bool {
    state.send_if_modified(|current| {
        if current.is_active() {
            *current = next;
            true
        } else {
            false
        }
    })
}

/// Cancels a subscription from anywhere. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SubscriptionCanceller {
    token: CancellationToken,
    state: Arc<watch::Sender<SubscriptionState>>,
}

impl SubscriptionCanceller {
    /// Transition `Active → Closed` and release the upstream stream.
    /// Idempotent; has no effect on a subscription that already failed.
    pub fn cancel(&self) {
        if transition(&self.state, SubscriptionState::Closed) {
            debug!("subscription cancelled");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Consumer side of one live subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    items: mpsc::Receiver<SubscriptionItem>,
    state: watch::Receiver<SubscriptionState>,
    canceller: SubscriptionCanceller,
}

impl SubscriptionHandle {
    /// Next item, or `None` once the subscription is closed or fully drained
    /// after a failure.
    pub async fn next(&mut self) -> Option<SubscriptionItem> {
        tokio::select! {
            biased;
            _ = self.canceller.token.cancelled() => None,
            item = self.items.recv() => item,
        }
    }

    /// Cancel this subscription (see [`SubscriptionCanceller::cancel`]).
    pub fn unsubscribe(&self) {
        self.canceller.cancel();
    }

    /// A handle that can cancel this subscription while `next()` is pending.
    pub fn canceller(&self) -> SubscriptionCanceller {
        self.canceller.clone()
    }

    /// Current state.
    pub fn state(&self) -> SubscriptionState {
        self.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<SubscriptionState> {
        self.state.clone()
    }

    /// Adapt into a `Stream` of items. Dropping the stream cancels the
    /// subscription.
    pub fn into_stream(self) -> impl Stream<Item = SubscriptionItem> + Send {
        futures::stream::unfold(self, |mut handle| async move {
            handle.next().await.map(|item| (item, handle))
        })
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.canceller.cancel();
    }
}

/// Opens decoded live subscriptions.
pub struct LiveSubscriber {
    subscriber: Arc<dyn LogSubscriber>,
    schema: Arc<InterfaceSchema>,
    decoder: LogDecoder,
    config: SubscriptionConfig,
    metrics: Option<ChainlogsMetrics>,
}

impl LiveSubscriber {
    pub fn new(subscriber: Arc<dyn LogSubscriber>, schema: Arc<InterfaceSchema>) -> Self {
        Self {
            subscriber,
            schema,
            decoder: LogDecoder::new(),
            config: SubscriptionConfig::default(),
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: SubscriptionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: ChainlogsMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Open a subscription for `filter`. Block bounds in the filter are
    /// ignored. Each call creates an independent subscription.
    pub async fn subscribe(&self, filter: &LogFilter) -> Result<SubscriptionHandle, StreamError> {
        let upstream = self.subscriber.subscribe_logs(filter).await?;

        let (tx, items) = mpsc::channel(self.config.channel_capacity.max(1));
        let (state_tx, state) = watch::channel(SubscriptionState::Active);
        let canceller = SubscriptionCanceller {
            token: CancellationToken::new(),
            state: Arc::new(state_tx),
        };

        let task = SubscriptionTask {
            upstream,
            outlet: Outlet {
                tx,
                canceller: canceller.clone(),
            },
            schema: Arc::clone(&self.schema),
            decoder: self.decoder.clone(),
            policy: self.config.decode_failure,
            metrics: self.metrics.clone(),
        };
        tokio::spawn(task.run());

        info!(
            addresses = filter.addresses.len(),
            policy = ?self.config.decode_failure,
            "live subscription started"
        );
        Ok(SubscriptionHandle {
            items,
            state,
            canceller,
        })
    }
}

// ─── Background task ──────────────────────────────────────────────────────────

struct SubscriptionTask {
    upstream: RawLogStream,
    outlet: Outlet,
    schema: Arc<InterfaceSchema>,
    decoder: LogDecoder,
    policy: DecodeFailurePolicy,
    metrics: Option<ChainlogsMetrics>,
}

/// Delivery side of the task: the consumer channel and the shared state.
struct Outlet {
    tx: mpsc::Sender<SubscriptionItem>,
    canceller: SubscriptionCanceller,
}

impl SubscriptionTask {
    async fn run(mut self) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.outlet.canceller.token.cancelled() => break,
                next = self.upstream.next() => next,
            };

            let log = match next {
                Some(Ok(log)) => log,
                Some(Err(err)) => {
                    self.outlet.fail(err).await;
                    break;
                }
                None => {
                    self.outlet.fail(StreamError::Closed).await;
                    break;
                }
            };

            if log.removed {
                debug!(block = ?log.block_number, log_index = ?log.log_index, "skipping removed log");
                if let Some(m) = &self.metrics {
                    m.record_skipped("removed", 1);
                }
                continue;
            }

            let item = match self.decoder.decode(&self.schema, &log) {
                Ok(event) => {
                    if let Some(m) = &self.metrics {
                        m.record_decoded(&event.name, MetricSource::Subscription);
                    }
                    SubscriptionItem::Event(event)
                }
                Err(error) => {
                    if let Some(m) = &self.metrics {
                        m.record_error(&error, MetricSource::Subscription);
                    }
                    match self.policy {
                        DecodeFailurePolicy::Isolate => {
                            warn!(
                                block = ?log.block_number,
                                log_index = ?log.log_index,
                                error = %error,
                                "log failed to decode"
                            );
                            SubscriptionItem::DecodeFailed { log, error }
                        }
                        DecodeFailurePolicy::Terminate => {
                            self.outlet.fail(StreamError::Decode(error)).await;
                            break;
                        }
                    }
                }
            };

            if !self.outlet.deliver(item).await {
                break;
            }
        }
        debug!("subscription task finished");
    }
}

impl Outlet {
    /// Forward one item; `false` once the consumer is gone or cancelled.
    async fn deliver(&self, item: SubscriptionItem) -> bool {
        tokio::select! {
            biased;
            _ = self.canceller.token.cancelled() => false,
            sent = self.tx.send(item) => {
                if sent.is_err() {
                    transition(&self.canceller.state, SubscriptionState::Closed);
                }
                sent.is_ok()
            }
        }
    }

    async fn fail(&self, err: StreamError) {
        if !transition(&self.canceller.state, SubscriptionState::Failed(err.clone())) {
            return;
        }
        warn!(error = %err, "live subscription failed");
        self.deliver(SubscriptionItem::Terminated(err)).await;
    }
}
