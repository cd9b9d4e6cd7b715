//! ChainLogs CLI: decode contract event logs from the command line.
//!
//! # Commands
//! ```text
//! chainlogs signature "ItemSet(bytes32,bytes32)"
//! chainlogs schema    --abi <path.json>
//! chainlogs decode    --abi <path.json> --topics <hex>... --data <hex>
//! chainlogs query     --abi <path.json> --address <addr> --from <block> [--to <block>]
//! chainlogs watch     --abi <path.json> --address <addr>
//! chainlogs code      --address <addr>
//! ```

use alloy_primitives::{Address, B256};
use anyhow::{anyhow, bail, Context, Result};
use chainlogs_core::{BlockTag, LogFilter, LogRecord, LogSource};
use chainlogs_evm::{event_signature_hash, function_selector, InterfaceSchema, LogDecoder};
use chainlogs_stream::HttpLogSource;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cmd_query;
mod cmd_watch;
mod config;
mod output;

use config::CliConfig;

#[derive(Parser)]
#[command(
    name = "chainlogs",
    about = "Decode Ethereum contract event logs: ABI inspection, historical queries, live subscriptions",
    long_about = "
ChainLogs CLI: resolve contract ABIs, decode event logs offline, query a
block range over HTTP JSON-RPC, or watch new events over WebSocket.

CONFIGURATION:
  chainlogs.yaml in the working directory is loaded when present
  (override with --config).

ENVIRONMENT VARIABLES:
  CHAINLOGS_HTTP_URL    HTTP JSON-RPC endpoint (query, code)
  CHAINLOGS_WS_URL      WebSocket endpoint (watch)
  RUST_LOG              tracing filter, replaces the configured log level
",
    version
)]
struct Cli {
    /// Config file (default: ./chainlogs.yaml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// HTTP JSON-RPC endpoint
    #[arg(long, global = true, env = "CHAINLOGS_HTTP_URL")]
    rpc_url: Option<String>,

    /// WebSocket JSON-RPC endpoint
    #[arg(long, global = true, env = "CHAINLOGS_WS_URL")]
    ws_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// ABI plus the contracts and event to look at.
#[derive(Args)]
struct EventTarget {
    /// ABI JSON file (plain array or compiler artifact with an "abi" key)
    #[arg(long)]
    abi: PathBuf,
    /// Contract address; repeat for several contracts
    #[arg(long = "address", required = true)]
    addresses: Vec<Address>,
    /// Only this event: a declared event name or a 0x-prefixed topic0 hash
    /// (default: every event in the ABI)
    #[arg(long)]
    topic0: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a canonical signature, e.g. "Transfer(address,address,uint256)"
    Signature { signature: String },

    /// List the events and functions of an ABI
    Schema {
        #[arg(long)]
        abi: PathBuf,
    },

    /// Decode one log from its raw topics and data
    Decode {
        #[arg(long)]
        abi: PathBuf,
        /// topics[0] = event signature hash, topics[1..] = indexed params
        #[arg(long, num_args = 1.., required = true)]
        topics: Vec<B256>,
        /// Non-indexed params (hex, 0x-prefixed)
        #[arg(long, default_value = "0x")]
        data: String,
        /// Emitting contract
        #[arg(long, default_value_t = Address::ZERO)]
        address: Address,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch and decode historical events in a block range
    Query {
        #[command(flatten)]
        target: EventTarget,
        /// First block (number, or latest/earliest/safe/finalized)
        #[arg(long)]
        from: BlockTag,
        /// Last block
        #[arg(long, default_value = "latest")]
        to: BlockTag,
        /// Report undecodable logs instead of failing the query
        #[arg(long)]
        skip_errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream newly emitted events until Ctrl-C
    Watch {
        #[command(flatten)]
        target: EventTarget,
        /// End the subscription on the first log that fails to decode
        #[arg(long)]
        strict: bool,
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Check that a contract is deployed at an address
    Code {
        #[arg(long)]
        address: Address,
        #[arg(long, default_value = "latest")]
        block: BlockTag,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?
        .with_endpoints(cli.rpc_url, cli.ws_url);
    if cli.verbose {
        config.log.level = "debug".into();
    }
    chainlogs_observability::init_tracing(&config.log).context("initialise logging")?;

    match cli.command {
        Commands::Signature { signature } => cmd_signature(&signature),
        Commands::Schema { abi } => cmd_schema(&abi),
        Commands::Decode {
            abi,
            topics,
            data,
            address,
            json,
        } => cmd_decode(&abi, topics, &data, address, json),
        Commands::Query {
            target,
            from,
            to,
            skip_errors,
            json,
        } => cmd_query::run(&config, &target, from, to, skip_errors, json).await,
        Commands::Watch {
            target,
            strict,
            json,
        } => cmd_watch::run(&config, &target, strict, json).await,
        Commands::Code { address, block } => cmd_code(&config, address, block).await,
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

fn load_schema(path: &std::path::Path) -> Result<InterfaceSchema> {
    InterfaceSchema::from_abi_file(path)
        .with_context(|| format!("load ABI '{}'", path.display()))
}

/// `topics[0]` for a name-or-hash argument.
fn resolve_topic0(schema: &InterfaceSchema, raw: &str) -> Result<B256> {
    if raw.starts_with("0x") {
        return raw
            .parse::<B256>()
            .with_context(|| format!("invalid topic0 hash '{raw}'"));
    }
    schema
        .event(raw)
        .filter(|e| !e.anonymous)
        .map(|e| e.signature_hash)
        .ok_or_else(|| anyhow!("event '{raw}' is not declared in the ABI"))
}

impl EventTarget {
    /// Load the ABI and build the address/topic filter for it.
    fn resolve(&self) -> Result<(InterfaceSchema, LogFilter)> {
        let schema = load_schema(&self.abi)?;
        let signatures: Vec<B256> = match &self.topic0 {
            Some(raw) => vec![resolve_topic0(&schema, raw)?],
            None => schema
                .events()
                .filter(|e| !e.anonymous)
                .map(|e| e.signature_hash)
                .collect(),
        };
        if signatures.is_empty() {
            bail!("'{}' declares no events", self.abi.display());
        }
        let filter = LogFilter::new()
            .addresses(self.addresses.iter().copied())
            .topic(0, signatures);
        Ok((schema, filter))
    }
}

// ─── Offline commands ────────────────────────────────────────────────────────

fn cmd_signature(signature: &str) -> Result<()> {
    let signature = signature.trim();
    if !signature.ends_with(')') || !signature.contains('(') {
        bail!("expected a canonical signature such as 'Transfer(address,address,uint256)'");
    }
    println!("Signature: {signature}");
    println!("Topic0:    {}", event_signature_hash(signature));
    println!("Selector:  0x{}", hex::encode(function_selector(signature)));
    Ok(())
}

fn cmd_schema(abi: &std::path::Path) -> Result<()> {
    let schema = load_schema(abi)?;
    print!("{}", output::schema(&schema));
    Ok(())
}

fn cmd_decode(
    abi: &std::path::Path,
    topics: Vec<B256>,
    data: &str,
    address: Address,
    as_json: bool,
) -> Result<()> {
    let schema = load_schema(abi)?;
    let data = hex::decode(data.strip_prefix("0x").unwrap_or(data)).context("invalid data hex")?;
    let log = LogRecord::new(address, topics, data);

    let event = LogDecoder::new().decode(&schema, &log)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&event)?);
    } else {
        print!("{}", output::event(1, &event));
    }
    Ok(())
}

// ─── Node commands ───────────────────────────────────────────────────────────

async fn cmd_code(config: &CliConfig, address: Address, block: BlockTag) -> Result<()> {
    let source = HttpLogSource::from_config(&config.node)
        .context("set --rpc-url or CHAINLOGS_HTTP_URL")?;
    let code = source
        .code_at(address, block)
        .await
        .with_context(|| format!("eth_getCode {address}"))?;
    if code.is_empty() {
        bail!("no contract deployed at {address} (block {block})");
    }
    println!("✓ Contract at {address}: {} bytes of code", code.len());
    Ok(())
}
