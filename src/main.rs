//! rpc-balancer demo client
//!
//! Resolves a logical service name through the in-process directory and
//! routes a series of calls with the configured balancing strategy.
//!
//! # Architecture Overview
//!
//! ```text
//!  ┌───────────┐  push   ┌─────────────────────────────────────────────┐
//!  │ Directory │────────▶│                  Channel                    │
//!  │ (config)  │resolver │  handles ─▶ ready set ─▶ PickerBuilder ──┐  │
//!  └─────▲─────┘         │                                          ▼  │
//!        │               │        call ◀── pick() ◀── Picker (ArcSwap)│
//!  ┌─────┴─────┐         └─────────────────────────────────────────────┘
//!  │  watcher  │                     ▲
//!  │ (--watch) │           StrategyRegistry (name → builder)
//!  └───────────┘
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use rpc_balancer::config::{load_config, watcher::DirectoryReloader, ClientConfig};
use rpc_balancer::observability::{logging, metrics};
use rpc_balancer::{Channel, Directory, DirectoryResolverBuilder, StrategyRegistry};

#[derive(Parser)]
#[command(name = "rpc-balancer")]
#[command(about = "Route calls across a service's endpoints with a load balancing strategy", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the dial target.
    #[arg(long)]
    target: Option<String>,

    /// Override the load balancing policy.
    #[arg(long)]
    policy: Option<String>,

    /// Number of calls to route.
    #[arg(short = 'n', long, default_value_t = 10)]
    calls: usize,

    /// Delay between calls in milliseconds.
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Reload the directory when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(target) = cli.target {
        config.client.target = target;
    }
    if let Some(policy) = cli.policy {
        config.client.load_balancing_policy = policy;
        config.client.default_service_config = None;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("rpc-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let directory = Arc::new(Directory::from_config(&config.services));
    let registry = StrategyRegistry::with_defaults(&config.balancer);
    let resolver = DirectoryResolverBuilder::new(config.client.resolver_scheme.clone(), directory.clone());
    let policy = config.client.effective_policy()?;

    tracing::info!(
        target_uri = %config.client.target,
        policy = %policy,
        services = config.services.len(),
        "Configuration loaded"
    );

    let channel = Channel::connect(&config.client.target, &policy, &resolver, &registry)?;

    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let reloader = DirectoryReloader::new(path, directory.clone(), config.services.clone());
            Some(reloader.watch()?)
        }
        (None, true) => {
            tracing::warn!("--watch needs --config, ignoring");
            None
        }
        _ => None,
    };

    let mut selections: BTreeMap<String, usize> = BTreeMap::new();
    let mut failures = 0usize;
    let mut ticker = tokio::time::interval(Duration::from_millis(cli.interval_ms.max(1)));

    for call in 1..=cli.calls {
        ticker.tick().await;
        match channel.pick() {
            Ok(subconn) => {
                tracing::info!(call, address = %subconn.address(), "Call routed");
                *selections.entry(subconn.address().to_string()).or_default() += 1;
            }
            Err(e) => {
                tracing::warn!(call, error = %e, "Call failed");
                failures += 1;
            }
        }
    }

    channel.close();

    let summary = serde_json::json!({
        "target": config.client.target,
        "policy": policy,
        "calls": cli.calls,
        "failures": failures,
        "selections": selections,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    tracing::info!("Shutdown complete");
    Ok(())
}
