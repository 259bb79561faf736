//! Pending frame requests awaiting a `frame-response` from the broadcaster.

use std::collections::VecDeque;

use lookout_common::new_correlation_id;
use serde_json::Value;
use tokio::sync::oneshot;

/// FIFO of one-shot response channels keyed by correlation id.
#[derive(Default)]
pub struct PendingFrames {
    queue: VecDeque<(String, oneshot::Sender<Value>)>,
}

impl PendingFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new request. The receiver yields the frame, or an error if the
    /// request is cancelled.
    pub fn register(&mut self) -> (String, oneshot::Receiver<Value>) {
        let (tx, rx) = oneshot::channel();
        let id = new_correlation_id();
        self.queue.push_back((id.clone(), tx));
        (id, rx)
    }

    /// Complete the request named by `request_id`, or the oldest one when no
    /// id is given. Returns whether a waiting request received the frame.
    pub fn resolve(&mut self, request_id: Option<&str>, frame: Value) -> bool {
        let pos = match request_id {
            Some(id) => self.queue.iter().position(|(rid, _)| rid == id),
            None => (!self.queue.is_empty()).then_some(0),
        };
        match pos.and_then(|i| self.queue.remove(i)) {
            Some((_, tx)) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    pub fn cancel(&mut self, request_id: &str) {
        self.queue.retain(|(rid, _)| rid != request_id);
    }

    /// Drop every pending request; waiters observe a closed channel.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolve_by_id() {
        let mut frames = PendingFrames::new();
        let (first, mut rx1) = frames.register();
        let (second, rx2) = frames.register();
        assert_ne!(first, second);

        assert!(frames.resolve(Some(second.as_str()), json!({"imageBase64": "b"})));
        assert_eq!(rx2.await.unwrap(), json!({"imageBase64": "b"}));
        assert!(rx1.try_recv().is_err());
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn resolve_without_id_takes_oldest() {
        let mut frames = PendingFrames::new();
        let (_, rx1) = frames.register();
        let (_, _rx2) = frames.register();

        assert!(frames.resolve(None, json!("first")));
        assert_eq!(rx1.await.unwrap(), json!("first"));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn resolve_unknown_id_is_ignored() {
        let mut frames = PendingFrames::new();
        let (_, _rx) = frames.register();
        assert!(!frames.resolve(Some("nope"), json!(null)));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn resolve_with_nothing_pending() {
        let mut frames = PendingFrames::new();
        assert!(!frames.resolve(None, json!(null)));
    }

    #[test]
    fn resolve_after_waiter_gave_up() {
        let mut frames = PendingFrames::new();
        let (id, rx) = frames.register();
        drop(rx);
        assert!(!frames.resolve(Some(id.as_str()), json!(null)));
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn cancel_closes_waiters() {
        let mut frames = PendingFrames::new();
        let (id, rx) = frames.register();
        let (_, rx_other) = frames.register();

        frames.cancel(&id);
        assert!(rx.await.is_err());
        assert_eq!(frames.len(), 1);

        assert_eq!(frames.cancel_all(), 1);
        assert!(rx_other.await.is_err());
        assert!(frames.is_empty());
    }
}
