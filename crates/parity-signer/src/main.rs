//! parity-signer: command-line client for a node's signer confirmation queue

use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use serde_json::Value;

use parity_signer_adapters::TransportConfig;
use parity_signer_core::{
    fetch_local_transactions, ConfirmationOutcome, LocalTxView, RequestStatus, RequestTracker,
    SignerQueue, SignerRequestId, Transport,
};

#[derive(Debug, Parser)]
#[command(name = "parity-signer", version, about)]
struct Cli {
    /// Node JSON-RPC endpoint (http(s):// or ws(s)://)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Log every encoded request and failed call
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute an arbitrary method; each param is parsed as JSON, else taken as a string
    Call { method: String, params: Vec<String> },
    /// List requests waiting in the signer queue
    Requests,
    /// Confirm a queued request with the account password
    Confirm {
        id: String,
        #[arg(long, env = "PARITY_SIGNER_PASSWORD")]
        password: String,
        /// JSON object of transaction fields to modify before signing
        #[arg(long)]
        modification: Option<String>,
    },
    /// Reject a queued request
    Reject { id: String },
    /// Post a transaction for confirmation and print the signer request id
    Post { transaction: String },
    /// Wait for a posted request to settle, then for its receipt
    Track { id: String },
    /// Show the node's local transactions, pending first
    LocalTxs,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = TransportConfig::from_env();
    if let Some(url) = cli.url {
        config.url = url;
    }
    config.debug |= cli.debug;

    tracing::info!(url = %config.url, "connecting");
    let transport: Arc<dyn Transport> = Arc::from(
        parity_signer_adapters::connect(&config)
            .await
            .wrap_err("failed to open rpc transport")?,
    );

    match cli.command {
        Command::Call { method, params } => {
            let params = params.iter().map(String::as_str).map(parse_param).collect();
            let result = transport.execute(&method, params).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Requests => {
            let queue = SignerQueue::new(transport);
            let pending = queue.refresh().await?;
            if pending.is_empty() {
                println!("no requests waiting for confirmation");
            }
            for request in pending {
                println!("{}  {}  origin={}", request.id, request.payload.kind(), request.origin);
            }
        }
        Command::Confirm {
            id,
            password,
            modification,
        } => {
            let id = parse_request_id(&id)?;
            let modification = match modification {
                Some(raw) => serde_json::from_str(&raw).wrap_err("invalid --modification json")?,
                None => Value::Object(Default::default()),
            };
            let queue = SignerQueue::new(transport);
            queue.refresh().await?;
            let outcome = queue.confirm(id, modification, &password).await?;
            print_outcome(id, &outcome);
        }
        Command::Reject { id } => {
            let id = parse_request_id(&id)?;
            let queue = SignerQueue::new(transport);
            queue.refresh().await?;
            queue.reject(id).await?;
            println!("{id} rejected");
        }
        Command::Post { transaction } => {
            let tx: Value = serde_json::from_str(&transaction).wrap_err("invalid transaction json")?;
            let id = tracker(transport, &config).post_transaction(tx).await?;
            println!("{id}");
        }
        Command::Track { id } => {
            let id = parse_request_id(&id)?;
            let tracker = tracker(transport, &config);
            match tracker.wait_for_request(id).await? {
                RequestStatus::Confirmed(ConfirmationOutcome::TransactionHash(hash)) => {
                    println!("{id} confirmed: {hash}");
                    let receipt = tracker.wait_for_receipt(hash).await?;
                    println!("{}", serde_json::to_string_pretty(&receipt)?);
                }
                RequestStatus::Confirmed(outcome) => print_outcome(id, &outcome),
                RequestStatus::Rejected => println!("{id} rejected"),
                RequestStatus::Pending => return Err(eyre!("{id} still pending")),
            }
        }
        Command::LocalTxs => {
            let mut view = LocalTxView::new();
            view.reconcile(fetch_local_transactions(transport.as_ref()).await?);
            for tx in view.entries() {
                let block = if tx.is_pending() {
                    "pending".to_owned()
                } else {
                    tx.block_number.to_string()
                };
                println!("{}  {:>10}  {}", tx.hash, block, tx.status);
            }
        }
    }
    Ok(())
}

fn tracker(transport: Arc<dyn Transport>, config: &TransportConfig) -> RequestTracker<Arc<dyn Transport>> {
    RequestTracker::new(transport)
        .with_poll_interval(config.poll_interval())
        .with_max_attempts(config.max_poll_attempts)
}

fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn parse_request_id(raw: &str) -> eyre::Result<SignerRequestId> {
    SignerRequestId::from_value(&Value::String(raw.to_owned()))
        .map_err(|e| eyre!("invalid request id {raw}: {e}"))
}

fn print_outcome(id: SignerRequestId, outcome: &ConfirmationOutcome) {
    match outcome {
        ConfirmationOutcome::TransactionHash(hash) => println!("{id} confirmed: {hash}"),
        ConfirmationOutcome::Signature(signature) => println!("{id} signed: {signature}"),
        ConfirmationOutcome::Other(value) => println!("{id} confirmed: {value}"),
    }
}
