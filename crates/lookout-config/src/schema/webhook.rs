use serde::{Deserialize, Serialize};

/// HTTP webhook bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Seconds to wait for the broadcaster to answer a frame request
    /// (valid range: 1-60).
    pub frame_timeout: u32,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".into(),
            port: 3001,
            frame_timeout: 5,
            allowed_origins: Vec::new(),
        }
    }
}

impl WebhookConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
