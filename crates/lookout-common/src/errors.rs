use std::path::PathBuf;

use crate::id::ConnectionId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures raised while handling signaling traffic.
///
/// None of these are fatal. The variants for which [`RelayError::is_user_facing`]
/// returns true are echoed back to the offending connection as an `error`
/// event; the rest are only logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("No active broadcaster")]
    NoBroadcaster,

    #[error("Already have a broadcaster")]
    AlreadyBroadcasting,

    #[error("Cannot watch your own broadcast")]
    SelfWatch,

    #[error("target connection is gone: {0}")]
    StaleTarget(ConnectionId),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("event '{0}' is not part of the active protocol mode")]
    WrongMode(String),

    #[error("Frame response timeout")]
    FrameTimeout,

    #[error("Broadcaster went away before responding")]
    BroadcasterGone,
}

impl RelayError {
    /// Whether the error is reported to the client that caused it.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NoBroadcaster | Self::AlreadyBroadcasting | Self::SelfWatch
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
