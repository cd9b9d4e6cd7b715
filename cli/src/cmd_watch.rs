//! `chainlogs watch`: decode events live until Ctrl-C or a transport failure.

use anyhow::{Context, Result};
use chainlogs_observability::ChainlogsMetrics;
use chainlogs_stream::{
    DecodeFailurePolicy, LiveSubscriber, SubscriptionItem, SubscriptionState, WsLogSubscriber,
};
use std::sync::Arc;
use tracing::info;

use crate::{config::CliConfig, output, EventTarget};

pub async fn run(config: &CliConfig, target: &EventTarget, strict: bool, as_json: bool) -> Result<()> {
    let (schema, filter) = target.resolve()?;

    let subscriber = WsLogSubscriber::from_config(&config.node)
        .context("set --ws-url or CHAINLOGS_WS_URL")?;
    eprintln!("Watching {} contract(s) via {}", filter.addresses.len(), subscriber.url());

    let mut sub_config = config.subscription.clone();
    if strict {
        sub_config.decode_failure = DecodeFailurePolicy::Terminate;
    }
    let live = LiveSubscriber::new(Arc::new(subscriber), Arc::new(schema))
        .with_config(sub_config)
        .with_metrics(ChainlogsMetrics::from_global());

    let mut handle = live.subscribe(&filter).await.context("open subscription")?;

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, unsubscribing");
            canceller.cancel();
        }
    });

    let mut count = 0usize;
    while let Some(item) = handle.next().await {
        match item {
            SubscriptionItem::Event(event) => {
                count += 1;
                if as_json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", output::event(count, &event));
                }
            }
            SubscriptionItem::DecodeFailed { log, error } => {
                eprintln!(
                    "✗ undecodable log (block {:?}, index {:?}): {error}",
                    log.block_number, log.log_index
                );
            }
            SubscriptionItem::Terminated(err) => {
                return Err(err).context(format!("subscription failed after {count} events"));
            }
        }
    }

    if let SubscriptionState::Failed(err) = handle.state() {
        return Err(err).context(format!("subscription failed after {count} events"));
    }
    eprintln!("✓ Stopped after {count} events");
    Ok(())
}
