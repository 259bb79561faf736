//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator runs them all and
//! collects errors into a single `ConfigError`.

mod helpers;
mod network;

#[cfg(test)]
mod tests;

use crate::schema::LookoutConfig;
use lookout_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LookoutConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    network::validate_relay(&mut errors, config);
    network::validate_webhook(&mut errors, config);
    network::validate_listeners(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
