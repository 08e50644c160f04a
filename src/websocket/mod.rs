use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod message_types;

/// Unique identifier for one live WebSocket connection.
///
/// A user can hold several simultaneous connections (devices, tabs); each
/// gets its own subscriber id so cleanup removes exactly the closed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Per-user broadcast groups.
///
/// Maps a user id to the senders of all of that user's live connections.
/// Fan-out targeted at a user reaches every device; `broadcast_all` reaches
/// every connection in the process (presence transitions).
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Vec<Subscriber>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new connection to `user_id`'s broadcast group.
    pub async fn add_subscriber(&self, user_id: Uuid) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard.entry(user_id).or_default().push(Subscriber {
            id: subscriber_id,
            sender: tx,
        });

        tracing::debug!(
            %user_id,
            connections = guard.get(&user_id).map(|v| v.len()).unwrap_or(0),
            "subscriber added"
        );

        (subscriber_id, rx)
    }

    /// Remove one connection from `user_id`'s group.
    ///
    /// Must be called when the connection closes, otherwise the dead sender
    /// lingers until the next broadcast sweeps it.
    pub async fn remove_subscriber(&self, user_id: Uuid, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&user_id) {
            subscribers.retain(|s| s.id != subscriber_id);
            if subscribers.is_empty() {
                guard.remove(&user_id);
            }
        }
    }

    /// Deliver `msg` to every live connection of `user_id`.
    ///
    /// Dead senders are dropped as a side effect.
    pub async fn send_to_user(&self, user_id: Uuid, msg: &str) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&user_id) {
            subscribers.retain(|s| s.sender.send(msg.to_string()).is_ok());
            if subscribers.is_empty() {
                guard.remove(&user_id);
            }
        }
    }

    /// Deliver `msg` to every connection in the process.
    pub async fn broadcast_all(&self, msg: &str) {
        let mut guard = self.inner.write().await;
        for subscribers in guard.values_mut() {
            subscribers.retain(|s| s.sender.send(msg.to_string()).is_ok());
        }
        guard.retain(|_, subscribers| !subscribers.is_empty());
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }
}
