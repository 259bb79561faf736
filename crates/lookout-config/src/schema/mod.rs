//! Configuration schema types for the signaling relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod relay;
mod system;
mod webhook;

pub use relay::*;
pub use system::*;
pub use webhook::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Every section has defaults; only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookoutConfig {
    pub relay: RelayConfig,
    pub webhook: WebhookConfig,
    pub logging: LoggingConfig,
}
