use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which of the two signaling protocol shapes the server speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolMode {
    /// `start-broadcast` registers the broadcaster (last writer wins); each
    /// watcher gets its own addressed offer from the broadcaster.
    #[default]
    FanOut,
    /// The first `offer` registers the broadcaster (first writer wins) and is
    /// cached and handed to every watcher.
    SharedOffer,
}

impl ProtocolMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FanOut => "fan-out",
            Self::SharedOffer => "shared-offer",
        }
    }
}

impl fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fan-out" | "fanout" => Ok(Self::FanOut),
            "shared-offer" | "shared" => Ok(Self::SharedOffer),
            other => Err(format!(
                "unknown protocol mode '{other}' (expected fan-out or shared-offer)"
            )),
        }
    }
}

/// WebSocket signaling listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub mode: ProtocolMode,
    /// Outbound queue depth per connection (valid range: 16-65536).
    pub channel_capacity: u32,
    /// Seconds to wait for the WebSocket handshake (valid range: 1-120).
    pub handshake_timeout: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            mode: ProtocolMode::FanOut,
            channel_capacity: 256,
            handshake_timeout: 10,
        }
    }
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
