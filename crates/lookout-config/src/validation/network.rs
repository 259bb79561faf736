//! Validation for the relay and webhook listeners.

use crate::schema::LookoutConfig;

use super::helpers::{validate_non_empty, validate_range};

/// Validate relay listener constraints.
pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &LookoutConfig) {
    validate_non_empty(errors, "relay.host", &config.relay.host);
    validate_range(
        errors,
        "relay.channel_capacity",
        config.relay.channel_capacity,
        16,
        65536,
    );
    validate_range(
        errors,
        "relay.handshake_timeout",
        config.relay.handshake_timeout,
        1,
        120,
    );
}

/// Validate webhook bridge constraints.
pub(crate) fn validate_webhook(errors: &mut Vec<String>, config: &LookoutConfig) {
    if !config.webhook.enabled {
        return;
    }
    validate_non_empty(errors, "webhook.host", &config.webhook.host);
    validate_range(
        errors,
        "webhook.frame_timeout",
        config.webhook.frame_timeout,
        1,
        60,
    );
    for origin in &config.webhook.allowed_origins {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            errors.push(format!(
                "webhook.allowed_origins entry '{origin}' must start with http:// or https://"
            ));
        }
    }
}

/// The two listeners cannot share a fixed port. Port 0 asks the OS for any
/// free port, so it never conflicts.
pub(crate) fn validate_listeners(errors: &mut Vec<String>, config: &LookoutConfig) {
    if config.webhook.enabled
        && config.relay.port != 0
        && config.relay.port == config.webhook.port
    {
        errors.push(format!(
            "webhook.port = {} conflicts with relay.port",
            config.webhook.port
        ));
    }
}
