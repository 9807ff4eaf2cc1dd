//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::HubConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

/// Connection strings may carry credentials and are never echoed
#[derive(Serialize)]
struct ConfigSummary {
    name: Option<String>,
    connection_set: bool,
    live: bool,
    flush_interval_ms: u64,
    max_queue_len: Option<usize>,
}

impl From<&HubConfig> for ConfigSummary {
    fn from(config: &HubConfig) -> Self {
        Self {
            name: config.name.clone(),
            connection_set: config.connection.is_some(),
            live: config.is_live(),
            flush_interval_ms: config.flush_interval_ms,
            max_queue_len: config.max_queue_len,
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // File only; environment overrides are a runtime concern
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = config_loader::warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary::from(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!(
                "\n  Hub: {}",
                summary.name.as_deref().unwrap_or(dispatcher::UNCONFIGURED_HUB)
            );
            println!("  Connection: {}", if summary.connection_set { "set" } else { "not set" });
            println!("  Mode: {}", if summary.live { "hub" } else { "console fallback" });
            println!("  Flush interval: {} ms", summary.flush_interval_ms);
            if let Some(max) = summary.max_queue_len {
                println!("  Max queue length: {}", max);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
