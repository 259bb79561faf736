//! Lookout configuration system.
//!
//! TOML-based configuration for the signaling relay and its webhook bridge.
//! All sections use defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lookout_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LogLevel, LoggingConfig, LookoutConfig, ProtocolMode, RelayConfig, WebhookConfig,
    CONFIG_SCHEMA_VERSION,
};

use lookout_common::ConfigError;
use std::path::Path;

/// Load config from `path`, or from the platform default path when `None`.
///
/// Environment overrides (see [`apply_overrides`]) are applied on top of the
/// file and the result is validated again. Logs through `tracing`, so install
/// the subscriber first; [`peek_log_level`] can pick its level.
pub fn load_config(path: Option<&Path>) -> Result<LookoutConfig, ConfigError> {
    let mut config = match path {
        Some(p) => toml_loader::load_from_path(p)?,
        None => toml_loader::load_default()?,
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validation::validate(&config)?;
    Ok(config)
}

/// Read just `logging.level` from the config file without logging or
/// creating anything. Missing or unreadable files yield the default level.
pub fn peek_log_level(path: Option<&Path>) -> LogLevel {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match toml_loader::default_config_path() {
            Ok(p) => p,
            Err(_) => return LogLevel::default(),
        },
    };
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|content| toml::from_str::<LookoutConfig>(&content).ok())
        .map(|config| config.logging.level)
        .unwrap_or_default()
}

/// Apply `HOST`, `PORT`, `WEBHOOK_HOST` and `WEBHOOK_PORT` overrides from
/// `lookup`.
///
/// `HOST` binds both listeners; `WEBHOOK_HOST` then replaces the webhook
/// host alone. Unparseable ports are ignored with a warning.
pub fn apply_overrides<F>(config: &mut LookoutConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("HOST") {
        config.relay.host = host.clone();
        config.webhook.host = host;
    }
    if let Some(host) = lookup("WEBHOOK_HOST") {
        config.webhook.host = host;
    }
    if let Some(port) = lookup("PORT") {
        match port.parse() {
            Ok(p) => config.relay.port = p,
            Err(e) => tracing::warn!("ignoring PORT={port}: {e}"),
        }
    }
    if let Some(port) = lookup("WEBHOOK_PORT") {
        match port.parse() {
            Ok(p) => config.webhook.port = p,
            Err(e) => tracing::warn!("ignoring WEBHOOK_PORT={port}: {e}"),
        }
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &LookoutConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
