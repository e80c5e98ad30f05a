mod log;
mod observer;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sched_assist_core::auth::{
    ClientConfig, CredentialManager, GoogleTokenEndpoint, LocalServerConsent, TokenStore,
};
use sched_assist_core::cancel::CancelToken;
use sched_assist_core::engine::ToolLoopEngine;
use sched_assist_core::foundry_client::FoundryClient;
use sched_assist_core::gate::{ChannelLines, ConfirmationGate};
use sched_assist_core::pipeline::{Driver, WorkflowRequest};
use sched_assist_core::providers::GoogleConnector;

use observer::ConsoleObserver;

const DEFAULT_LOG_FILTER: &str = "sched_assist_core=info,sched_assist_host=info";

/// Scan the mailbox for a meeting request, propose free slots, ask which one
/// to take, and book it.
#[derive(Parser, Debug)]
#[command(name = "sched-assist", version)]
struct Cli {
    /// Mailbox search query used by triage
    #[arg(long, default_value = "is:unread subject:meeting")]
    query: String,

    /// Length of the slot search window, in days from now
    #[arg(long, default_value_t = 7)]
    days: i64,

    /// Topic hint for triage
    #[arg(long)]
    topic: Option<String>,

    /// Credential file (overrides SCHED_ASSIST_TOKEN_PATH)
    #[arg(long)]
    token_path: Option<PathBuf>,

    /// Give up on the confirmation prompt after this many seconds
    #[arg(long)]
    confirm_timeout_secs: Option<u64>,

    /// Cancel the whole run after this many seconds
    #[arg(long)]
    max_run_secs: Option<u64>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    // Fail on missing client config before anything touches the network.
    let config = ClientConfig::from_env()?;
    let store = match &cli.token_path {
        Some(path) => TokenStore::new(path),
        None => TokenStore::from_env(),
    };
    info!(path = %store.path().display(), "using credential file");

    let credentials = CredentialManager::new(
        config,
        store,
        GoogleTokenEndpoint::new()?,
        LocalServerConsent::new(),
    );
    let client = FoundryClient::from_env().context("reasoning engine is not configured")?;
    let engine = ToolLoopEngine::new(&client);

    let cancel = CancelToken::new();
    if let Some(secs) = cli.max_run_secs {
        let watchdog = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            watchdog.cancel();
        });
    }

    let mut gate = ConfirmationGate::new(ChannelLines::stdin(), io::stdout())
        .with_timeout(cli.confirm_timeout_secs.map(Duration::from_secs))
        .with_cancel(cancel.clone());

    let request = WorkflowRequest::upcoming(cli.query, Utc::now(), cli.days, cli.topic)
        .context("invalid search window")?;
    log::info(format!(
        "Searching '{}', proposing slots in {}",
        request.mailbox_query, request.window
    ));

    let outcome = Driver::new(&credentials, &GoogleConnector, &engine)
        .with_observer(&ConsoleObserver)
        .with_cancel(cancel)
        .run(&request, &mut gate);

    match outcome {
        Ok(result) => {
            log::success("Workflow finished");
            println!("{result}");
            Ok(())
        }
        Err(err) => {
            log::error(&err);
            Err(err.into())
        }
    }
}
