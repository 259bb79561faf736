//! Relay dispatcher: the single entry point transport and webhook code use
//! to touch signaling state.
//!
//! Registry, session state and pending frame requests live in one [`Hub`]
//! behind one mutex. Each operation locks once, mutates, queues outbound
//! events without blocking, and unlocks, so concurrent messages from
//! different connections are applied one at a time.

use std::sync::Arc;
use std::time::Duration;

use lookout_common::{ConnectionId, RelayError};
use lookout_config::ProtocolMode;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::frames::PendingFrames;
use crate::protocol::{ClientEvent, ServerEvent, Signal, SignalKind, Target};
use crate::registry::ConnectionRegistry;
use crate::session::SessionManager;

/// Point-in-time view used by `/health`.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    pub broadcaster: Option<ConnectionId>,
    pub watcher_count: usize,
    pub connection_count: usize,
    pub pending_frames: usize,
    pub mode: ProtocolMode,
}

struct Hub {
    registry: ConnectionRegistry,
    session: SessionManager,
    frames: PendingFrames,
}

impl Hub {
    fn apply(&mut self, from: &ConnectionId, event: ClientEvent) -> Result<(), RelayError> {
        match event {
            ClientEvent::StartBroadcast => self.session.start_broadcast(&mut self.registry, from),
            ClientEvent::Watch => self.session.watch_request(&mut self.registry, from),
            ClientEvent::StopWatching => {
                self.session.stop_watching(&mut self.registry, from);
                Ok(())
            }
            ClientEvent::EndBroadcast => {
                self.session.end_broadcast(&mut self.registry, from);
                Ok(())
            }
            ClientEvent::Offer(data) => match self.session.mode() {
                ProtocolMode::SharedOffer => self.session.offer(&mut self.registry, from, data),
                ProtocolMode::FanOut => {
                    let signal = Signal::from_data(SignalKind::Offer, data)?;
                    match signal.target {
                        Target::Peer(to) => self.relay(from, &to, signal.kind, signal.body),
                        Target::ByRole => Err(RelayError::Malformed(
                            "offer needs a 'to' address in fan-out mode".into(),
                        )),
                    }
                }
            },
            ClientEvent::Answer(data) => self.route(from, Signal::from_data(SignalKind::Answer, data)?),
            ClientEvent::Ice(data) => self.route(from, Signal::from_data(SignalKind::Ice, data)?),
            ClientEvent::FrameResponse(frame) => self.frame_response(from, frame),
        }
    }

    fn route(&mut self, from: &ConnectionId, signal: Signal) -> Result<(), RelayError> {
        match signal.target {
            Target::Peer(to) => self.relay(from, &to, signal.kind, signal.body),
            Target::ByRole => {
                self.relay_by_role(from, signal.kind, signal.body);
                Ok(())
            }
        }
    }

    fn relay(
        &self,
        from: &ConnectionId,
        to: &ConnectionId,
        kind: SignalKind,
        body: Value,
    ) -> Result<(), RelayError> {
        if !self.registry.is_live(to) {
            return Err(RelayError::StaleTarget(to.clone()));
        }
        debug!(from = %from, to = %to, event = kind.event(), "Relaying signal");
        self.registry
            .send(to, ServerEvent::signal(kind, from.clone(), body));
        Ok(())
    }

    /// Broadcaster → everyone else; anyone else → broadcaster.
    fn relay_by_role(&self, from: &ConnectionId, kind: SignalKind, body: Value) {
        let Some(broadcaster) = self.session.broadcaster() else {
            warn!(from = %from, event = kind.event(), "No broadcaster to route signal to");
            return;
        };
        let event = ServerEvent::signal(kind, from.clone(), body);
        if broadcaster == from {
            let n = self.registry.broadcast_except(from, &event);
            debug!(from = %from, recipients = n, event = kind.event(), "Relayed from broadcaster");
        } else {
            self.registry.send(broadcaster, event);
            debug!(from = %from, event = kind.event(), "Relayed to broadcaster");
        }
    }

    fn frame_response(&mut self, from: &ConnectionId, frame: Value) -> Result<(), RelayError> {
        if !self.session.is_broadcaster(from) {
            return Err(RelayError::Malformed(
                "frame-response from a connection that is not broadcasting".into(),
            ));
        }
        let request_id = frame
            .get("requestId")
            .and_then(Value::as_str)
            .map(str::to_owned);
        if !self.frames.resolve(request_id.as_deref(), frame) {
            warn!(conn = %from, request_id = ?request_id, "Frame response with no waiting request");
        }
        Ok(())
    }

    /// Pending frame requests belong to one broadcaster; drop them when it
    /// is replaced or leaves.
    fn reconcile_frames(&mut self, before: Option<ConnectionId>) {
        if before.is_some() && self.session.broadcaster() != before.as_ref() {
            let n = self.frames.cancel_all();
            if n > 0 {
                info!(cancelled = n, "Cancelled pending frame requests");
            }
        }
    }
}

/// Cloneable handle to the shared signaling state.
#[derive(Clone)]
pub struct Relay {
    hub: Arc<Mutex<Hub>>,
    channel_capacity: usize,
}

impl Relay {
    pub fn new(mode: ProtocolMode, channel_capacity: usize) -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub {
                registry: ConnectionRegistry::new(),
                session: SessionManager::new(mode),
                frames: PendingFrames::new(),
            })),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Register a new transport session. Events for it arrive on the
    /// returned receiver.
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let id = self.hub.lock().await.registry.register(tx);
        (id, rx)
    }

    /// Tear down a transport session: session cleanup first, then removal.
    /// Idempotent.
    pub async fn disconnect(&self, id: &ConnectionId) {
        let mut hub = self.hub.lock().await;
        let hub = &mut *hub;
        let before = hub.session.broadcaster().cloned();
        hub.session.disconnect(&mut hub.registry, id);
        hub.reconcile_frames(before);
        hub.registry.unregister(id);
    }

    /// Process one inbound client event. User-facing failures are sent back
    /// as `error`; everything else is logged and dropped.
    pub async fn handle(&self, from: &ConnectionId, event: ClientEvent) {
        let name = event.name();
        let mut hub = self.hub.lock().await;
        let before = hub.session.broadcaster().cloned();
        let result = hub.apply(from, event);
        hub.reconcile_frames(before);

        if let Err(err) = result {
            if err.is_user_facing() {
                debug!(conn = %from, event = name, error = %err, "Rejected");
                hub.registry.send(from, ServerEvent::error(&err));
            } else {
                warn!(conn = %from, event = name, error = %err, "Dropped");
            }
        }
    }

    /// Forward an opaque payload from one connection to another.
    pub async fn relay(
        &self,
        from: &ConnectionId,
        to: &ConnectionId,
        kind: SignalKind,
        body: Value,
    ) -> Result<(), RelayError> {
        self.hub.lock().await.relay(from, to, kind, body)
    }

    /// Ask the broadcaster for a frame and wait up to `timeout` for it.
    pub async fn request_frame(&self, timeout: Duration) -> Result<Value, RelayError> {
        let (request_id, rx) = {
            let mut hub = self.hub.lock().await;
            let broadcaster = hub
                .session
                .broadcaster()
                .cloned()
                .ok_or(RelayError::NoBroadcaster)?;
            let (request_id, rx) = hub.frames.register();
            let sent = hub.registry.send(
                &broadcaster,
                ServerEvent::FrameRequest {
                    request_id: request_id.clone(),
                },
            );
            if !sent {
                hub.frames.cancel(&request_id);
                return Err(RelayError::BroadcasterGone);
            }
            debug!(conn = %broadcaster, request_id = %request_id, "Frame requested");
            (request_id, rx)
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(RelayError::BroadcasterGone),
            Err(_) => {
                self.hub.lock().await.frames.cancel(&request_id);
                warn!(request_id = %request_id, ?timeout, "Frame request timed out");
                Err(RelayError::FrameTimeout)
            }
        }
    }

    /// Forward an external instruction to the broadcaster.
    pub async fn send_instruction(&self, payload: Value) -> Result<(), RelayError> {
        let hub = self.hub.lock().await;
        let broadcaster = hub.session.broadcaster().ok_or(RelayError::NoBroadcaster)?;
        let instruction = payload
            .get("instruction")
            .or_else(|| payload.get("text"))
            .cloned()
            .unwrap_or(Value::Null);
        if !hub.registry.send(
            broadcaster,
            ServerEvent::Instruction {
                instruction,
                data: payload,
            },
        ) {
            return Err(RelayError::BroadcasterGone);
        }
        Ok(())
    }

    pub async fn health(&self) -> HealthSnapshot {
        let hub = self.hub.lock().await;
        HealthSnapshot {
            broadcaster: hub.session.broadcaster().cloned(),
            watcher_count: hub.session.watchers().len(),
            connection_count: hub.registry.len(),
            pending_frames: hub.frames.len(),
            mode: hub.session.mode(),
        }
    }
}
