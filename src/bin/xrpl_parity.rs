//! Differential-testing CLI for a validating XRPL node and an indexing server.
//!
//! The harness sends identical JSON-RPC requests to both servers and
//! reports where their responses diverge outside a known ignore-set.
//!
//! **Key modes**
//! - One-shot compare: `xrpl-parity compare account_info '{"account": "r..."}'`
//! - Health check: `xrpl-parity server-state`
//! - Funded smoke run: `xrpl-parity smoke` (standalone node required)
//! - Stream tap: `xrpl-parity watch --streams ledger,transactions`
//!
//! Endpoints come from `XRPL_PARITY_*` environment variables with flag
//! overrides; see `HarnessConfig::from_env`.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use xrpl_parity_harness::compare::CompareOptions;
use xrpl_parity_harness::{Harness, ServerKind, StreamListener, TxRequest};
use xrpl_parity_transport::dispatcher::Payload;
use xrpl_parity_types::HarnessConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON-RPC URL of the validating node.
    #[arg(long, value_name = "URL")]
    rippled_url: Option<String>,

    /// JSON-RPC URL of the indexing server.
    #[arg(long, value_name = "URL")]
    indexer_url: Option<String>,

    /// Treat the node as a standalone validator (advance the ledger
    /// manually after submissions).
    #[arg(long)]
    standalone: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send one request to both servers and diff the responses.
    Compare {
        /// RPC method name (e.g. account_info, ledger, account_lines).
        method: String,
        /// Request parameters as a JSON object.
        #[arg(default_value = "{}")]
        params: String,
        /// Extra response keys to ignore, comma separated.
        #[arg(long, value_name = "KEYS", value_delimiter = ',')]
        ignore: Vec<String>,
    },
    /// Print both servers' server_state responses.
    ServerState,
    /// Create two funded accounts, move XRP between them, and compare
    /// the resulting account state on both servers.
    Smoke,
    /// Subscribe to streams on the node's WebSocket port and print
    /// messages until interrupted.
    Watch {
        /// Stream names to subscribe to.
        #[arg(long, value_delimiter = ',', default_value = "ledger")]
        streams: Vec<String>,
        /// How long to listen, in seconds.
        #[arg(long, default_value_t = 60)]
        duration: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = HarnessConfig::from_env();
    if let Some(url) = args.rippled_url {
        config.rippled_url = url;
    }
    if let Some(url) = args.indexer_url {
        config.indexer_url = url;
    }
    if args.standalone {
        config.standalone = true;
    }

    match args.command {
        Command::Compare {
            method,
            params,
            ignore,
        } => {
            let params: Value =
                serde_json::from_str(&params).context("params is not valid JSON")?;
            let mut options = CompareOptions::server_defaults();
            options.ignore_keys.extend(ignore);
            let harness = Harness::new(config);
            harness.compare_servers(&method, params, &options)?;
            println!("{method}: responses are equivalent");
        }
        Command::ServerState => {
            let harness = Harness::new(config);
            for (label, kind) in [("node", ServerKind::Node), ("indexer", ServerKind::Indexer)] {
                harness
                    .ping(kind)
                    .with_context(|| format!("{label} is unreachable"))?;
                let state = harness.server_state(kind)?;
                println!("--- {label} ---");
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
        }
        Command::Smoke => smoke(config)?,
        Command::Watch { streams, duration } => {
            let listener = StreamListener::subscribe(
                &config.ws_url,
                json!({"streams": streams}),
                config.stream_settle,
            )?;
            info!(url = %config.ws_url, "subscribed; listening for {duration}s");
            let deadline = std::time::Instant::now() + Duration::from_secs(duration);
            while std::time::Instant::now() < deadline {
                match listener.next_message() {
                    Some(message) => println!("{message}"),
                    None => std::thread::sleep(Duration::from_millis(200)),
                }
            }
        }
    }
    Ok(())
}

/// Minimal end-to-end exercise against a live server pair: fund two
/// accounts, pay between them, then diff both servers' view of the
/// result.
fn smoke(config: HarnessConfig) -> Result<()> {
    let mut harness = Harness::new(config);

    let alice = harness.create_account(true, None)?;
    let bob = harness.create_account(true, None)?;
    info!(alice = %alice.address, bob = %bob.address, "accounts funded");

    let payment = Payload::tx(
        json!({
            "TransactionType": "Payment",
            "Account": alice.address,
            "Destination": bob.address,
            "Amount": "1000000"
        }),
        alice.signing_seed().to_string(),
    );
    harness.execute_transaction(TxRequest::new(payment))?;
    info!("payment validated");

    let options = CompareOptions::server_defaults();
    for account in [&alice.address, &bob.address] {
        harness.compare_servers("account_info", json!({"account": account}), &options)?;
        harness.compare_servers("account_objects", json!({"account": account}), &options)?;
    }
    println!("smoke run passed: both servers agree on account state");
    Ok(())
}
