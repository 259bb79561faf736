//! Signaling wire protocol.
//!
//! Every WebSocket text frame carries one `{"event": ..., "data": ...}`
//! object. Session descriptions and ICE candidates inside `data` are opaque:
//! the relay only looks at the addressing envelope around them.

use lookout_common::{ConnectionId, RelayError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names used on the wire.
pub mod events {
    pub const START_BROADCAST: &str = "start-broadcast";
    pub const OFFER: &str = "offer";
    pub const ANSWER: &str = "answer";
    pub const ICE: &str = "ice";
    pub const WATCH: &str = "watch";
    pub const STOP_WATCHING: &str = "stop-watching";
    pub const BROADCAST_ENDED: &str = "broadcast-ended";
    pub const BROADCAST_CLOSE: &str = "broadcast_close";
    pub const FRAME_RESPONSE: &str = "frame-response";
}

/// Raw inbound frame before the event name is interpreted.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Messages received from clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    StartBroadcast,
    Offer(Value),
    Answer(Value),
    Ice(Value),
    Watch,
    StopWatching,
    /// `broadcast-ended` or its alias `broadcast_close`.
    EndBroadcast,
    FrameResponse(Value),
}

impl ClientEvent {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| RelayError::Malformed(format!("invalid frame: {e}")))?;

        let event = match envelope.event.as_str() {
            events::START_BROADCAST => Self::StartBroadcast,
            events::OFFER => Self::Offer(envelope.data),
            events::ANSWER => Self::Answer(envelope.data),
            events::ICE => Self::Ice(envelope.data),
            events::WATCH => Self::Watch,
            events::STOP_WATCHING => Self::StopWatching,
            events::BROADCAST_ENDED | events::BROADCAST_CLOSE => Self::EndBroadcast,
            events::FRAME_RESPONSE => Self::FrameResponse(envelope.data),
            other => return Err(RelayError::Malformed(format!("unknown event '{other}'"))),
        };
        Ok(event)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StartBroadcast => events::START_BROADCAST,
            Self::Offer(_) => events::OFFER,
            Self::Answer(_) => events::ANSWER,
            Self::Ice(_) => events::ICE,
            Self::Watch => events::WATCH,
            Self::StopWatching => events::STOP_WATCHING,
            Self::EndBroadcast => events::BROADCAST_ENDED,
            Self::FrameResponse(_) => events::FRAME_RESPONSE,
        }
    }
}

/// The three relayed negotiation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Ice,
}

impl SignalKind {
    pub fn event(&self) -> &'static str {
        match self {
            Self::Offer => events::OFFER,
            Self::Answer => events::ANSWER,
            Self::Ice => events::ICE,
        }
    }

    /// Field that carries the opaque payload inside an addressed envelope.
    pub fn payload_key(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Ice => "candidate",
        }
    }
}

/// Where a relayed signal should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Explicit `to` address.
    Peer(ConnectionId),
    /// No address: route by the sender's role.
    ByRole,
}

/// A negotiation payload split from its addressing envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    pub target: Target,
    pub body: Value,
}

impl Signal {
    /// Split `data` into target and body.
    ///
    /// `{to, <key>}` is addressed. Without `to`, the body is the `<key>` field
    /// when present (`{role, candidate}`), otherwise the whole payload.
    pub fn from_data(kind: SignalKind, data: Value) -> Result<Self, RelayError> {
        if data.is_null() {
            return Err(RelayError::Malformed(format!("{} without payload", kind.event())));
        }

        let key = kind.payload_key();
        match data {
            Value::Object(mut map) => {
                let target = match map.remove("to") {
                    Some(Value::String(to)) => Target::Peer(ConnectionId::from(to)),
                    Some(other) => {
                        return Err(RelayError::Malformed(format!(
                            "{} 'to' must be a string, got {other}",
                            kind.event()
                        )))
                    }
                    None => Target::ByRole,
                };

                let body = match (map.remove(key), &target) {
                    (Some(body), _) => body,
                    (None, Target::Peer(_)) => {
                        return Err(RelayError::Malformed(format!(
                            "addressed {} is missing '{key}'",
                            kind.event()
                        )))
                    }
                    (None, Target::ByRole) => Value::Object(map),
                };
                Ok(Self { kind, target, body })
            }
            bare => Ok(Self {
                kind,
                target: Target::ByRole,
                body: bare,
            }),
        }
    }
}

/// Messages the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    BroadcastStarted {
        id: ConnectionId,
    },
    BroadcastEnded,
    WatcherJoined {
        id: ConnectionId,
    },
    WatcherLeft {
        id: ConnectionId,
    },
    Offer {
        from: ConnectionId,
        offer: Value,
    },
    Answer {
        from: ConnectionId,
        answer: Value,
    },
    Ice {
        from: ConnectionId,
        candidate: Value,
    },
    Error {
        message: String,
    },
    FrameRequest {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    Instruction {
        instruction: Value,
        data: Value,
    },
}

impl ServerEvent {
    /// Wrap a relayed payload with its sender.
    pub fn signal(kind: SignalKind, from: ConnectionId, body: Value) -> Self {
        match kind {
            SignalKind::Offer => Self::Offer { from, offer: body },
            SignalKind::Answer => Self::Answer { from, answer: body },
            SignalKind::Ice => Self::Ice {
                from,
                candidate: body,
            },
        }
    }

    pub fn error(err: &RelayError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}
