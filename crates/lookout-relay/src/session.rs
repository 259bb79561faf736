//! Session state manager: who is broadcasting and who is watching.
//!
//! All transitions take the registry by reference so that role changes and
//! the notifications they cause happen in the same step as the state
//! mutation.

use std::collections::HashSet;

use lookout_common::{ConnectionId, RelayError};
use lookout_config::ProtocolMode;
use serde_json::Value;
use tracing::{debug, info};

use crate::protocol::{events, ServerEvent};
use crate::registry::{ConnectionRegistry, Role};

/// Process-wide broadcast state.
#[derive(Debug, Default)]
pub struct SessionState {
    broadcaster_id: Option<ConnectionId>,
    /// Cached offer handed to every watcher (shared-offer mode only).
    current_offer: Option<Value>,
    /// Active watchers (fan-out mode only).
    watchers: HashSet<ConnectionId>,
}

/// The only mutator of [`SessionState`].
pub struct SessionManager {
    mode: ProtocolMode,
    state: SessionState,
}

impl SessionManager {
    pub fn new(mode: ProtocolMode) -> Self {
        Self {
            mode,
            state: SessionState::default(),
        }
    }

    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    pub fn broadcaster(&self) -> Option<&ConnectionId> {
        self.state.broadcaster_id.as_ref()
    }

    pub fn is_broadcaster(&self, id: &ConnectionId) -> bool {
        self.state.broadcaster_id.as_ref() == Some(id)
    }

    pub fn current_offer(&self) -> Option<&Value> {
        self.state.current_offer.as_ref()
    }

    pub fn watchers(&self) -> &HashSet<ConnectionId> {
        &self.state.watchers
    }

    /// Register `id` as broadcaster, superseding any previous one.
    pub fn start_broadcast(
        &mut self,
        registry: &mut ConnectionRegistry,
        id: &ConnectionId,
    ) -> Result<(), RelayError> {
        if self.mode != ProtocolMode::FanOut {
            return Err(RelayError::WrongMode(events::START_BROADCAST.into()));
        }

        if let Some(previous) = self.state.broadcaster_id.take() {
            if &previous != id {
                info!(previous = %previous, next = %id, "Broadcaster superseded");
                registry.send(&previous, ServerEvent::BroadcastEnded);
                registry.set_role(&previous, Role::Unassigned);
            }
        }

        for watcher in self.state.watchers.drain() {
            registry.set_role(&watcher, Role::Unassigned);
            if &watcher != id {
                registry.send(&watcher, ServerEvent::BroadcastEnded);
            }
        }

        self.state.broadcaster_id = Some(id.clone());
        registry.set_role(id, Role::Broadcaster);
        registry.send(id, ServerEvent::BroadcastStarted { id: id.clone() });
        info!(conn = %id, "Broadcast started");
        Ok(())
    }

    /// Register `id` as broadcaster with a shared offer. The first
    /// broadcaster keeps the role until it leaves; a repeat offer from it
    /// replaces the cached one.
    pub fn offer(
        &mut self,
        registry: &mut ConnectionRegistry,
        id: &ConnectionId,
        offer: Value,
    ) -> Result<(), RelayError> {
        if self.mode != ProtocolMode::SharedOffer {
            return Err(RelayError::WrongMode(events::OFFER.into()));
        }
        if let Some(current) = &self.state.broadcaster_id {
            if current != id {
                return Err(RelayError::AlreadyBroadcasting);
            }
        }

        self.state.broadcaster_id = Some(id.clone());
        self.state.current_offer = Some(offer);
        registry.set_role(id, Role::Broadcaster);
        info!(conn = %id, "Shared offer registered");
        Ok(())
    }

    /// Handle a watch request from `id`.
    pub fn watch_request(
        &mut self,
        registry: &mut ConnectionRegistry,
        id: &ConnectionId,
    ) -> Result<(), RelayError> {
        let broadcaster = self
            .state
            .broadcaster_id
            .clone()
            .ok_or(RelayError::NoBroadcaster)?;
        if &broadcaster == id {
            return Err(RelayError::SelfWatch);
        }

        match self.mode {
            ProtocolMode::FanOut => {
                self.state.watchers.insert(id.clone());
                registry.set_role(id, Role::Watcher);
                registry.send(&broadcaster, ServerEvent::WatcherJoined { id: id.clone() });
                info!(
                    conn = %id,
                    watchers = self.state.watchers.len(),
                    "Watcher joined"
                );
            }
            ProtocolMode::SharedOffer => {
                let offer = self
                    .state
                    .current_offer
                    .clone()
                    .ok_or(RelayError::NoBroadcaster)?;
                registry.send(
                    id,
                    ServerEvent::Offer {
                        from: broadcaster,
                        offer,
                    },
                );
                debug!(conn = %id, "Sent cached offer");
            }
        }
        Ok(())
    }

    /// Remove `id` from the watcher set. Returns whether it was watching.
    pub fn stop_watching(&mut self, registry: &mut ConnectionRegistry, id: &ConnectionId) -> bool {
        if !self.state.watchers.remove(id) {
            return false;
        }
        registry.set_role(id, Role::Unassigned);
        if let Some(broadcaster) = &self.state.broadcaster_id {
            registry.send(broadcaster, ServerEvent::WatcherLeft { id: id.clone() });
        }
        info!(
            conn = %id,
            watchers = self.state.watchers.len(),
            "Watcher left"
        );
        true
    }

    /// End the broadcast if `id` is the broadcaster. Every other live
    /// connection is told the broadcast ended.
    pub fn end_broadcast(&mut self, registry: &mut ConnectionRegistry, id: &ConnectionId) -> bool {
        if !self.is_broadcaster(id) {
            return false;
        }

        self.state.broadcaster_id = None;
        self.state.current_offer = None;
        for watcher in self.state.watchers.drain() {
            registry.set_role(&watcher, Role::Unassigned);
        }
        registry.set_role(id, Role::Unassigned);
        let notified = registry.broadcast_except(id, &ServerEvent::BroadcastEnded);
        info!(conn = %id, notified, "Broadcast ended");
        true
    }

    /// Cleanup for a closing connection. Safe to call more than once.
    pub fn disconnect(&mut self, registry: &mut ConnectionRegistry, id: &ConnectionId) {
        self.end_broadcast(registry, id);
        self.stop_watching(registry, id);
    }
}
