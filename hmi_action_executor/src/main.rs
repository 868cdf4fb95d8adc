//! # HMI Action Executor Binary
//!
//! Attaches to the shared tag region described by a configuration file and
//! runs one action document against it.
//!
//! # Usage
//!
//! ```bash
//! # Run an action document
//! hmi_action_executor --config /etc/hmi/tag_exchange.toml --actions start_line.json
//!
//! # Verbose, JSON formatted logs
//! hmi_action_executor -c tag_exchange.toml -a start_line.json -v --json
//! ```
//!
//! Ctrl-C aborts the running tree; pending waits end immediately and no
//! further nodes start.

#![deny(warnings)]

use clap::Parser;
use hmi_action_executor::{ActionEngine, ActionTree, LoggingNavigator, StoreProvider};
use hmi_common::config::{ConfigLoader, LogLevel, TagExchangeConfig};
use hmi_shared_memory::SharedVariableStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// HMI Action Executor - runs action trees against the shared tag region
#[derive(Parser, Debug)]
#[command(name = "hmi_action_executor")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Runs HMI action trees against the shared tag region")]
#[command(long_about = None)]
struct Args {
    /// Path to the tag exchange configuration (region + tag list)
    #[arg(short, long, default_value = "/etc/hmi/tag_exchange.toml")]
    config: PathBuf,

    /// Path to the action document (JSON)
    #[arg(short, long)]
    actions: PathBuf,

    /// Enable verbose logging (at least debug, overrides `shared.log_level`)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    // Loaded before tracing so the configured level applies from the start.
    let config = TagExchangeConfig::load(&args.config);
    let log_level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    let result = match config {
        Ok(config) => run(&args, config),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("Action executor failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: TagExchangeConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("🚀 HMI Action Executor starting...");

    config.validate()?;
    info!(
        service = %config.shared.service_name,
        region = %config.region.name,
        tags = config.tags.len(),
        "Configuration loaded from {}",
        args.config.display()
    );

    let tree = ActionTree::load(&args.actions)?;
    info!(root = %tree.root_id(), nodes = tree.len(), "Action document loaded");

    let store = Arc::new(SharedVariableStore::from_config(&config)?);
    debug!(layout = %store.layout_json()?, "Region layout");

    let engine = ActionEngine::new(
        Arc::new(StoreProvider::new(Arc::clone(&store))),
        Arc::new(LoggingNavigator),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(async {
        let run = engine.execute(&tree);
        tokio::pin!(run);
        tokio::select! {
            report = &mut run => report,
            _ = signal::ctrl_c() => {
                warn!("🛑 Interrupt received, aborting action tree");
                engine.abort();
                run.await
            }
        }
    });

    store.close();

    for failure in &report.failures {
        warn!(node = %failure.id, "Failed: {}", failure.message);
    }
    if report.cancelled {
        warn!("Action tree aborted");
    } else {
        info!(
            executed = report.executed.len(),
            failures = report.failures.len(),
            "✅ Action tree completed"
        );
    }
    Ok(())
}

fn setup_tracing(args: &Args, configured: LogLevel) {
    let configured = Level::from(configured);
    let level = if args.verbose {
        configured.max(Level::DEBUG)
    } else {
        configured
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
