//! SSE fanout manager (§4.I), grounded on `sse_manager.py`'s client
//! registry: a monotonic client id, a bounded per-client queue, a ring
//! buffer of recent messages for reconnect replay, and a reverse index
//! from user to their client ids for targeted delivery.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use conduit_core::error::{ConduitError, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};

/// Bounded so one slow reader can't grow memory unboundedly; full queues
/// are evicted rather than blocking the broadcaster (§4.I).
const DEFAULT_QUEUE_SIZE: usize = 100;
const DEFAULT_HISTORY_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct SseMessage {
    pub id: u64,
    pub event: String,
    pub data: Value,
}

struct Client {
    user_id: Option<String>,
    sender: mpsc::Sender<SseMessage>,
}

struct PartitionState {
    clients: HashMap<u64, Client>,
    by_user: HashMap<String, Vec<u64>>,
    history: VecDeque<SseMessage>,
}

impl PartitionState {
    fn new() -> Self {
        Self {
            clients: HashMap::new(),
            by_user: HashMap::new(),
            history: VecDeque::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SseStats {
    pub total_clients: usize,
    pub total_users: usize,
    pub user_distribution: HashMap<String, usize>,
    pub message_history_size: usize,
    pub max_queue_size: usize,
}

/// Fans SSE messages out to subscribed clients, scoped per partition, and
/// keeps a bounded history so a reconnecting client can replay what it
/// missed via `missed_since` (§4.I).
pub struct SseManager {
    partitions: RwLock<HashMap<String, PartitionState>>,
    next_client_id: AtomicU64,
    next_message_id: AtomicU64,
    queue_size: usize,
    history_size: usize,
}

impl SseManager {
    pub fn new(queue_size: usize, history_size: usize) -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            next_client_id: AtomicU64::new(1),
            next_message_id: AtomicU64::new(1),
            queue_size: if queue_size == 0 { DEFAULT_QUEUE_SIZE } else { queue_size },
            history_size: if history_size == 0 { DEFAULT_HISTORY_SIZE } else { history_size },
        }
    }

    /// Registers a new client under `partition_key`, returning its id and
    /// the receiving half of its message queue.
    pub async fn add_client(&self, partition_key: &str, user_id: Option<&str>) -> (u64, mpsc::Receiver<SseMessage>) {
        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.queue_size);

        let mut partitions = self.partitions.write().await;
        let state = partitions.entry(partition_key.to_string()).or_insert_with(PartitionState::new);
        state.clients.insert(
            client_id,
            Client {
                user_id: user_id.map(str::to_string),
                sender: tx,
            },
        );
        if let Some(uid) = user_id {
            state.by_user.entry(uid.to_string()).or_default().push(client_id);
        }
        (client_id, rx)
    }

    pub async fn remove_client(&self, partition_key: &str, client_id: u64) {
        let mut partitions = self.partitions.write().await;
        let Some(state) = partitions.get_mut(partition_key) else {
            return;
        };
        if let Some(client) = state.clients.remove(&client_id) {
            if let Some(uid) = client.user_id {
                if let Some(ids) = state.by_user.get_mut(&uid) {
                    ids.retain(|id| *id != client_id);
                    if ids.is_empty() {
                        state.by_user.remove(&uid);
                    }
                }
            }
        }
    }

    /// Sends `event`/`data` to every client in `partition_key`, recording
    /// it in the partition's history ring buffer. A client whose queue is
    /// full is evicted rather than allowed to back-pressure the broadcast
    /// (§4.I).
    pub async fn broadcast(&self, partition_key: &str, event: &str, data: Value) -> Result<u64> {
        let message = SseMessage {
            id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            event: event.to_string(),
            data,
        };

        let mut partitions = self.partitions.write().await;
        let state = partitions.entry(partition_key.to_string()).or_insert_with(PartitionState::new);

        // Recorded before delivery is attempted, per §4.I: the id is
        // allocated and the message durable in history regardless of
        // whether any client queue accepts it.
        state.history.push_back(message.clone());
        while state.history.len() > self.history_size {
            state.history.pop_front();
        }

        let mut evict = Vec::new();
        for (id, client) in state.clients.iter() {
            if client.sender.try_send(message.clone()).is_err() {
                evict.push(*id);
            }
        }
        for id in evict {
            if let Some(client) = state.clients.remove(&id) {
                if let Some(uid) = client.user_id {
                    if let Some(ids) = state.by_user.get_mut(&uid) {
                        ids.retain(|cid| *cid != id);
                    }
                }
            }
        }

        Ok(message.id)
    }

    pub async fn send_to_client(&self, partition_key: &str, client_id: u64, event: &str, data: Value) -> Result<()> {
        let message = SseMessage {
            id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            event: event.to_string(),
            data,
        };

        let mut partitions = self.partitions.write().await;
        let state = partitions
            .get_mut(partition_key)
            .ok_or_else(|| ConduitError::Internal(format!("no SSE clients registered for partition {partition_key}")))?;

        state.history.push_back(message.clone());
        while state.history.len() > self.history_size {
            state.history.pop_front();
        }

        let client = state
            .clients
            .get(&client_id)
            .ok_or_else(|| ConduitError::Internal(format!("unknown SSE client {client_id}")))?;
        client
            .sender
            .try_send(message)
            .map_err(|_| ConduitError::Internal(format!("client {client_id} queue full")))
    }

    pub async fn send_to_user(&self, partition_key: &str, user_id: &str, event: &str, data: Value) -> Result<usize> {
        let mut partitions = self.partitions.write().await;
        let Some(state) = partitions.get_mut(partition_key) else {
            return Ok(0);
        };
        let Some(client_ids) = state.by_user.get(user_id).cloned() else {
            return Ok(0);
        };
        let mut sent = 0;
        for id in client_ids {
            let message = SseMessage {
                id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
                event: event.to_string(),
                data: data.clone(),
            };
            state.history.push_back(message.clone());
            while state.history.len() > self.history_size {
                state.history.pop_front();
            }
            if let Some(client) = state.clients.get(&id) {
                if client.sender.try_send(message).is_ok() {
                    sent += 1;
                }
            }
        }
        Ok(sent)
    }

    /// Replays history entries with `id > since` for a reconnecting client
    /// (`Last-Event-ID` handling).
    pub async fn missed_since(&self, partition_key: &str, since: u64) -> Vec<SseMessage> {
        let partitions = self.partitions.read().await;
        let Some(state) = partitions.get(partition_key) else {
            return Vec::new();
        };
        state.history.iter().filter(|m| m.id > since).cloned().collect()
    }

    pub async fn stats(&self, partition_key: &str) -> SseStats {
        let partitions = self.partitions.read().await;
        let Some(state) = partitions.get(partition_key) else {
            return SseStats {
                total_clients: 0,
                total_users: 0,
                user_distribution: HashMap::new(),
                message_history_size: 0,
                max_queue_size: self.queue_size,
            };
        };
        let user_distribution = state
            .by_user
            .iter()
            .map(|(user, ids)| (user.clone(), ids.len()))
            .collect();
        SseStats {
            total_clients: state.clients.len(),
            total_users: state.by_user.len(),
            user_distribution,
            message_history_size: state.history.len(),
            max_queue_size: self.queue_size,
        }
    }

    /// Drops every registered client across every partition, used on
    /// shutdown so SSE writer loops observe a closed channel and exit.
    pub async fn cleanup_all(&self) {
        let mut partitions = self.partitions.write().await;
        partitions.clear();
    }
}

pub type SharedSseManager = Arc<SseManager>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_delivers_to_registered_clients() {
        let manager = SseManager::new(10, 100);
        let (client_id, mut rx) = manager.add_client("acme", Some("user-1")).await;
        manager.broadcast("acme", "notify", serde_json::json!({"hello": "world"})).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, "notify");
        manager.remove_client("acme", client_id).await;
        let stats = manager.stats("acme").await;
        assert_eq!(stats.total_clients, 0);
    }

    #[tokio::test]
    async fn missed_since_replays_only_newer_messages() {
        let manager = SseManager::new(10, 100);
        let first = manager.broadcast("acme", "notify", serde_json::json!(1)).await.unwrap();
        manager.broadcast("acme", "notify", serde_json::json!(2)).await.unwrap();
        let missed = manager.missed_since("acme", first).await;
        assert_eq!(missed.len(), 1);
    }

    #[tokio::test]
    async fn send_to_user_fans_out_to_all_of_their_clients() {
        let manager = SseManager::new(10, 100);
        let (_id1, mut rx1) = manager.add_client("acme", Some("user-1")).await;
        let (_id2, mut rx2) = manager.add_client("acme", Some("user-1")).await;
        let sent = manager.send_to_user("acme", "user-1", "notify", serde_json::json!(1)).await.unwrap();
        assert_eq!(sent, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn send_to_user_is_replayable_after_reconnect() {
        let manager = SseManager::new(10, 100);
        let (_id, mut rx) = manager.add_client("acme", Some("user-1")).await;
        manager.send_to_user("acme", "user-1", "response", serde_json::json!({"method": "tools/list"})).await.unwrap();
        let delivered = rx.recv().await.unwrap();
        let missed = manager.missed_since("acme", delivered.id - 1).await;
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].id, delivered.id);
    }

    #[tokio::test]
    async fn send_to_client_is_recorded_in_history() {
        let manager = SseManager::new(10, 100);
        let (client_id, mut rx) = manager.add_client("acme", None).await;
        manager.send_to_client("acme", client_id, "response", serde_json::json!(1)).await.unwrap();
        let delivered = rx.recv().await.unwrap();
        let missed = manager.missed_since("acme", delivered.id - 1).await;
        assert_eq!(missed.len(), 1);
    }
}
