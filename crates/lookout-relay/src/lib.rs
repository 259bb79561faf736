//! lookout-relay: WebRTC signaling relay.
//!
//! Brokers session descriptions and ICE candidates between one broadcaster
//! and any number of watchers over WebSocket. The relay never inspects
//! negotiation payloads and never touches media. An optional HTTP webhook
//! bridge lets outside services reach the current broadcaster.

pub mod connection;
pub mod dispatcher;
pub mod frames;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod webhook;

pub use dispatcher::{HealthSnapshot, Relay};
pub use protocol::{ClientEvent, ServerEvent, SignalKind};
pub use registry::{ConnectionRegistry, Role};
pub use server::{start, ServerHandle};
pub use session::SessionManager;
