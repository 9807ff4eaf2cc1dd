//! `run` command implementation.

use std::time::Instant;

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, ENV_HUB_CONNECTION, ENV_HUB_NAME};
use contracts::{HubConfig, HubProvider};
use dispatcher::{Dispatcher, DispatcherOptions, MemoryHub, UdpHubProvider};
use tokio::io::{AsyncRead, BufReader};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{feed_events, FeedStats, RunStats};

/// Execute the `run` command
pub async fn run_dispatch(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;

    info!(
        hub = ?config.name,
        live = config.is_live(),
        flush_interval_ms = config.flush_interval_ms,
        max_queue_len = ?config.max_queue_len,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    // Dry run - same pipeline, but batches stay in memory
    if args.dry_run {
        info!("Dry run mode - dispatching to an in-memory hub");
        print_config_summary(&config);
        let hub = MemoryHub::new();
        dispatch(args, config, hub.provider()).await?;
        println!(
            "Dry run: {} batches ({} events) would have been sent",
            hub.sent_batches().len(),
            hub.sent_events().len()
        );
        return Ok(());
    }

    dispatch(args, config, UdpHubProvider).await
}

/// Feed input into a dispatcher until EOF or a shutdown signal
async fn dispatch<P>(args: &RunArgs, config: HubConfig, provider: P) -> Result<()>
where
    P: HubProvider + Send + Sync + 'static,
{
    let input = open_input(args).await?;
    let start_time = Instant::now();
    let options = DispatcherOptions::new(config).with_provider(provider);
    let dispatcher = Dispatcher::start(options).await;
    let collector = dispatcher.collector();

    let mut feed = FeedStats::default();
    {
        let reading = feed_events(BufReader::new(input), &collector, &mut feed);
        tokio::select! {
            result = reading => result.context("Failed to read events")?,
            _ = shutdown_signal() => {
                warn!("Received shutdown signal, stopping dispatch...");
            }
        }
    }

    info!(
        collected = feed.events_collected,
        skipped = feed.lines_skipped,
        "Input finished, flushing"
    );
    let summary = dispatcher.shutdown().await;

    RunStats {
        feed,
        duration: start_time.elapsed(),
        metrics: collector.metrics(),
        summary,
    }
    .print_summary();

    info!("Hub Dispatch finished");
    Ok(())
}

/// File, environment and command-line settings, in increasing precedence
fn load_config(args: &RunArgs) -> Result<HubConfig> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
    }

    let mut config = ConfigLoader::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(ms) = args.flush_interval_ms {
        info!(flush_interval_ms = ms, "Overriding flush interval from CLI");
        config.flush_interval_ms = ms;
    }

    ConfigLoader::with_overrides(config, |key| match key {
        ENV_HUB_NAME => args.name.clone(),
        ENV_HUB_CONNECTION => args.connection.clone(),
        _ => None,
    })
    .context("Invalid command-line overrides")
}

async fn open_input(args: &RunArgs) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(CliError::from)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &HubConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!(
        "  Hub: {}",
        config.name.as_deref().unwrap_or(dispatcher::UNCONFIGURED_HUB)
    );
    println!(
        "  Connection: {}",
        if config.connection.is_some() { "set" } else { "not set" }
    );
    println!(
        "  Mode: {}",
        if config.is_live() { "hub" } else { "console fallback" }
    );
    println!("  Flush interval: {} ms", config.flush_interval_ms);
    match config.max_queue_len {
        Some(max) => println!("  Max queue length: {}", max),
        None => println!("  Max queue length: unbounded"),
    }
    println!();
}
