//! `chainlogs query`: one `eth_getLogs` over a block range, decoded.

use anyhow::{Context, Result};
use chainlogs_core::{BlockTag, QueryError};
use chainlogs_evm::DecodePolicy;
use chainlogs_observability::ChainlogsMetrics;
use chainlogs_stream::{HistoricalQuery, HttpLogSource};
use std::sync::Arc;

use crate::{config::CliConfig, output, EventTarget};

pub async fn run(
    config: &CliConfig,
    target: &EventTarget,
    from: BlockTag,
    to: BlockTag,
    skip_errors: bool,
    as_json: bool,
) -> Result<()> {
    let (schema, filter) = target.resolve()?;
    let filter = filter.from_block(from).to_block(to);

    let source = HttpLogSource::from_config(&config.node)
        .context("set --rpc-url or CHAINLOGS_HTTP_URL")?;
    eprintln!("Querying {} from block {from} to {to}", source.url());

    let mut query = HistoricalQuery::new(Arc::new(source), Arc::new(schema))
        .with_config(config.query.clone())
        .with_metrics(ChainlogsMetrics::from_global());
    if skip_errors {
        query = query.with_decode_policy(DecodePolicy::Skip);
    }

    let outcome = match query.run(&filter).await {
        Ok(outcome) => outcome,
        Err(err @ QueryError::RangeTooLarge { .. }) => {
            return Err(err).context("the node refused the range; query smaller block ranges");
        }
        Err(err) => return Err(err).context("historical query failed"),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome.events)?);
    } else {
        for (i, event) in outcome.events.iter().enumerate() {
            println!("{}", output::event(i + 1, event));
        }
    }

    for skipped in &outcome.skipped {
        eprintln!("✗ log #{} skipped: {}", skipped.index, skipped.source);
    }
    eprintln!(
        "✓ {} events decoded, {} skipped, {} removed by reorg",
        outcome.events.len(),
        outcome.skipped.len(),
        outcome.removed
    );
    Ok(())
}
