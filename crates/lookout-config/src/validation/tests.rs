//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = LookoutConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_channel_capacity_too_small() {
    let mut config = LookoutConfig::default();
    config.relay.channel_capacity = 4;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.channel_capacity"));
}

#[test]
fn catches_handshake_timeout_zero() {
    let mut config = LookoutConfig::default();
    config.relay.handshake_timeout = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.handshake_timeout"));
}

#[test]
fn catches_empty_host() {
    let mut config = LookoutConfig::default();
    config.relay.host = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.host must not be empty"));
}

#[test]
fn catches_frame_timeout_out_of_range() {
    let mut config = LookoutConfig::default();
    config.webhook.frame_timeout = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("webhook.frame_timeout"));
}

#[test]
fn catches_origin_without_scheme() {
    let mut config = LookoutConfig::default();
    config.webhook.allowed_origins = vec!["localhost:5173".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("localhost:5173"));
}

#[test]
fn disabled_webhook_skips_its_checks() {
    let mut config = LookoutConfig::default();
    config.webhook.enabled = false;
    config.webhook.frame_timeout = 0;
    config.webhook.port = config.relay.port;
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_port_conflict() {
    let mut config = LookoutConfig::default();
    config.webhook.port = config.relay.port;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("conflicts with relay.port"));
}

#[test]
fn ephemeral_ports_never_conflict() {
    let mut config = LookoutConfig::default();
    config.relay.port = 0;
    config.webhook.port = 0;
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_multiple_errors() {
    let mut config = LookoutConfig::default();
    config.relay.channel_capacity = 1;
    config.webhook.frame_timeout = 1000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.channel_capacity"));
    assert!(err.contains("webhook.frame_timeout"));
    assert!(err.contains("; "));
}
