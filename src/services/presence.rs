use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-wide record of which users have at least one live connection.
///
/// Holds a refcount per user, not a boolean: a user with two devices stays
/// online until the last connection closes. Counts never go negative.
#[derive(Default, Clone)]
pub struct PresenceTracker {
    inner: Arc<RwLock<HashMap<Uuid, usize>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. Returns true on the offline -> online edge.
    pub async fn connection_opened(&self, user_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        let count = guard.entry(user_id).or_insert(0);
        *count += 1;
        let became_online = *count == 1;
        if became_online {
            tracing::debug!(%user_id, "user online");
        }
        became_online
    }

    /// Record a closed connection. Returns true on the online -> offline edge.
    pub async fn connection_closed(&self, user_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        match guard.get_mut(&user_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                guard.remove(&user_id);
                tracing::debug!(%user_id, "user offline");
                true
            }
            // Close without a matching open; refcount stays at zero.
            None => false,
        }
    }

    /// Current set of online users, for the post-auth snapshot.
    pub async fn snapshot(&self) -> Vec<Uuid> {
        let guard = self.inner.read().await;
        guard.keys().copied().collect()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        let guard = self.inner.read().await;
        guard.contains_key(&user_id)
    }
}
