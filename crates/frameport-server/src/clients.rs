//! The set of connected frontend clients and the broadcast hub.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Per-client outbound buffer. A client that falls this far behind while its
/// socket task is alive simply waits; a closed channel gets it evicted.
const CLIENT_BUFFER: usize = 256;

/// Thread-safe set of connected clients, keyed by connection id.
#[derive(Clone, Default)]
pub struct ClientSet {
    clients: Arc<RwLock<HashMap<Uuid, mpsc::Sender<String>>>>,
}

impl ClientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client; returns its id and the receiving end of its buffer.
    pub async fn register(&self) -> (Uuid, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        let id = Uuid::new_v4();
        self.clients.write().await.insert(id, tx);
        (id, rx)
    }

    /// Remove a client on disconnect.
    pub async fn remove(&self, id: &Uuid) {
        self.clients.write().await.remove(id);
    }

    /// Number of connected clients.
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Send an already-serialized message to every connected client. A
    /// failure to reach one client is isolated: the rest still receive the
    /// message and the dead client is evicted. Returns the delivery count.
    pub async fn broadcast(&self, message: &str) -> usize {
        let targets: Vec<(Uuid, mpsc::Sender<String>)> = {
            let clients = self.clients.read().await;
            clients.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in targets {
            if tx.send(message.to_string()).await.is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut clients = self.clients.write().await;
            for id in dead {
                tracing::debug!(client = %id, "evicting unreachable client");
                clients.remove(&id);
            }
        }
        delivered
    }
}
