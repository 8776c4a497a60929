//! Registry of online identities and the channel that reaches each one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

/// Thread-safe map from registered name to that connection's outbound queue.
#[derive(Clone, Default)]
pub struct Registry {
    peers: Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for a connection. Fails if the name is already online.
    pub async fn register(&self, name: &str, tx: mpsc::Sender<String>) -> Result<(), &'static str> {
        let mut map = self.peers.write().await;
        if let Some(existing) = map.get(name) {
            if !existing.is_closed() {
                return Err("name already registered");
            }
        }
        map.insert(name.to_string(), tx);
        Ok(())
    }

    /// Outbound queue for `name`, if online.
    pub async fn sender(&self, name: &str) -> Option<mpsc::Sender<String>> {
        self.peers
            .read()
            .await
            .get(name)
            .filter(|tx| !tx.is_closed())
            .cloned()
    }

    /// A name whose connection has gone away counts as offline even before
    /// its entry is released.
    pub async fn is_online(&self, name: &str) -> bool {
        self.peers
            .read()
            .await
            .get(name)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Release `name`, but only if it still belongs to the connection
    /// owning `tx`.
    pub async fn unregister(&self, name: &str, tx: &mpsc::Sender<String>) {
        let mut map = self.peers.write().await;
        if map.get(name).is_some_and(|current| current.same_channel(tx)) {
            map.remove(name);
        }
    }

    /// Number of registered identities.
    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = Registry::new();
        let (tx, mut rx) = mpsc::channel(4);
        registry.register("alice", tx).await.unwrap();

        assert!(registry.is_online("alice").await);
        assert!(!registry.is_online("bob").await);

        registry
            .sender("alice")
            .await
            .unwrap()
            .send("hi".into())
            .await
            .unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn duplicate_name_is_refused() {
        let registry = Registry::new();
        let (tx1, _rx1) = mpsc::channel(4);
        let (tx2, _rx2) = mpsc::channel(4);
        registry.register("alice", tx1).await.unwrap();
        assert_eq!(
            registry.register("alice", tx2).await,
            Err("name already registered")
        );
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn name_with_dead_connection_can_be_reclaimed() {
        let registry = Registry::new();
        let (tx1, rx1) = mpsc::channel(4);
        registry.register("alice", tx1).await.unwrap();
        drop(rx1);

        let (tx2, _rx2) = mpsc::channel(4);
        assert!(registry.register("alice", tx2).await.is_ok());
    }

    #[tokio::test]
    async fn dead_connection_is_offline_before_unregister() {
        let registry = Registry::new();
        let (tx, rx) = mpsc::channel(4);
        registry.register("bob", tx).await.unwrap();
        drop(rx);

        assert!(!registry.is_online("bob").await);
        assert!(registry.sender("bob").await.is_none());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn unregister_removes_own_entry_only() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::channel(4);
        let (stranger, _stranger_rx) = mpsc::channel(4);
        registry.register("alice", tx.clone()).await.unwrap();

        registry.unregister("alice", &stranger).await;
        assert!(registry.is_online("alice").await);

        registry.unregister("alice", &tx).await;
        assert!(!registry.is_online("alice").await);
        assert_eq!(registry.count().await, 0);
    }
}
