//! Connection registry: maps live connection ids to their outbound queue
//! and role.

use std::collections::HashMap;

use lookout_common::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::protocol::ServerEvent;

/// Role of a connected client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Unassigned,
    Broadcaster,
    Watcher,
}

struct Connection {
    tx: mpsc::Sender<ServerEvent>,
    role: Role,
}

/// Live connections. Mutated only by transport lifecycle events and role
/// changes driven by the session manager.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection and assign it a fresh id.
    pub fn register(&mut self, tx: mpsc::Sender<ServerEvent>) -> ConnectionId {
        let mut id = ConnectionId::new();
        while self.connections.contains_key(&id) {
            id = ConnectionId::new();
        }
        self.connections.insert(
            id.clone(),
            Connection {
                tx,
                role: Role::Unassigned,
            },
        );
        id
    }

    /// Forget a connection. Returns false if it was already gone.
    pub fn unregister(&mut self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    /// Best-effort delivery to one connection. Never blocks; returns whether
    /// the event was queued.
    pub fn send(&self, id: &ConnectionId, event: ServerEvent) -> bool {
        let Some(conn) = self.connections.get(id) else {
            warn!(conn = %id, "Dropping event for unknown connection");
            return false;
        };
        match conn.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(conn = %id, "Outbound queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn = %id, "Outbound queue closed");
                false
            }
        }
    }

    /// Deliver to every live connection except `except`. Returns the number
    /// of connections the event was queued for.
    pub fn broadcast_except(&self, except: &ConnectionId, event: &ServerEvent) -> usize {
        self.connections
            .keys()
            .filter(|id| *id != except)
            .filter(|id| self.send(id, event.clone()))
            .count()
    }

    pub fn set_role(&mut self, id: &ConnectionId, role: Role) {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.role = role;
        }
    }

    pub fn role(&self, id: &ConnectionId) -> Option<Role> {
        self.connections.get(id).map(|c| c.role)
    }

    pub fn is_live(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(reg: &mut ConnectionRegistry) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (reg.register(tx), rx)
    }

    #[test]
    fn register_assigns_unique_unassigned_ids() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        let (b, _rb) = connect(&mut reg);
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.role(&a), Some(Role::Unassigned));
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        assert!(reg.unregister(&a));
        assert!(!reg.unregister(&a));
        assert!(reg.is_empty());
        assert_eq!(reg.role(&a), None);
    }

    #[test]
    fn send_delivers_to_live_connection() {
        let mut reg = ConnectionRegistry::new();
        let (a, mut ra) = connect(&mut reg);
        assert!(reg.send(&a, ServerEvent::BroadcastEnded));
        assert_eq!(ra.try_recv().unwrap(), ServerEvent::BroadcastEnded);
    }

    #[test]
    fn send_to_unknown_connection_is_silent() {
        let reg = ConnectionRegistry::new();
        assert!(!reg.send(&ConnectionId::from("ghost"), ServerEvent::BroadcastEnded));
    }

    #[test]
    fn send_to_closed_receiver_is_silent() {
        let mut reg = ConnectionRegistry::new();
        let (a, ra) = connect(&mut reg);
        drop(ra);
        assert!(!reg.send(&a, ServerEvent::BroadcastEnded));
    }

    #[test]
    fn send_never_blocks_on_full_queue() {
        let mut reg = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let a = reg.register(tx);
        assert!(reg.send(&a, ServerEvent::BroadcastEnded));
        assert!(!reg.send(&a, ServerEvent::BroadcastEnded));
    }

    #[test]
    fn broadcast_except_skips_sender() {
        let mut reg = ConnectionRegistry::new();
        let (a, mut ra) = connect(&mut reg);
        let (_b, mut rb) = connect(&mut reg);
        let (_c, mut rc) = connect(&mut reg);

        let sent = reg.broadcast_except(&a, &ServerEvent::BroadcastEnded);
        assert_eq!(sent, 2);
        assert!(ra.try_recv().is_err());
        assert_eq!(rb.try_recv().unwrap(), ServerEvent::BroadcastEnded);
        assert_eq!(rc.try_recv().unwrap(), ServerEvent::BroadcastEnded);
    }

    #[test]
    fn set_role_ignores_unknown_ids() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        reg.set_role(&a, Role::Watcher);
        reg.set_role(&ConnectionId::from("ghost"), Role::Broadcaster);
        assert_eq!(reg.role(&a), Some(Role::Watcher));
        assert!(!reg.is_live(&ConnectionId::from("ghost")));
    }
}
