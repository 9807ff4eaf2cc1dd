//! Config validation
//!
//! Rules:
//! - name / connection, when present, are not blank
//! - flush_interval_ms > 0
//! - max_queue_len, when present, > 0
//!
//! Missing name or connection is not an error: the dispatcher falls back to
//! console logging and warns at connect time.

use contracts::{ContractError, HubConfig};
use validator::Validate;

/// Validate a HubConfig
///
/// Returns the first failing field, or Ok(()).
pub fn validate(config: &HubConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };

    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, errs)) => {
            let message = errs
                .iter()
                .map(|e| e.code.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(ContractError::config_validation(field.to_string(), message))
        }
        None => Err(ContractError::config_validation("config", errors.to_string())),
    }
}

/// Non-fatal findings worth surfacing to an operator
pub fn warnings(config: &HubConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.name.is_none() {
        warnings.push("name is not set - events will be logged to console".to_string());
    }
    if config.connection.is_none() {
        warnings.push("connection is not set - events will be logged to console".to_string());
    }
    if config.max_queue_len.is_none() {
        warnings.push(
            "max_queue_len is not set - the queue grows without bound while the hub is unreachable"
                .to_string(),
        );
    }

    warnings
}
