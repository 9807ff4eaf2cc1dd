//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Hub Dispatch - buffered, size-aware event delivery to a batch hub
#[derive(Parser, Debug)]
#[command(
    name = "hub-dispatch",
    author,
    version,
    about = "Buffered event dispatch to a batch-ingestion hub",
    long_about = "Reads tracking events as JSON lines, queues them and sends them to a \n\
                  batch-ingestion hub in size-limited batches every flush interval.\n\n\
                  Without a hub name and connection string, events are printed to \n\
                  the console instead."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "HUB_DISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "HUB_DISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch events read from a file or stdin
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults only when omitted
    #[arg(short, long, env = "HUB_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON-lines event file (stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override hub name from configuration and environment
    #[arg(long)]
    pub name: Option<String>,

    /// Override connection string from configuration and environment
    #[arg(long)]
    pub connection: Option<String>,

    /// Override the flush interval in milliseconds
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Dispatch to an in-memory hub instead of the network
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "HUB_DISPATCH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "hub.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
