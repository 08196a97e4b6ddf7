//! In-process document store.
//!
//! `MemoryGateway` keeps confirmed documents per collection and, while offline,
//! a queue of local writes layered on top of them. Subscribers see the layered
//! view, with queued documents flagged as having pending writes, the same way a
//! hosted document database with offline persistence reports latency-compensated
//! snapshots. Going back online flushes the queue and resolves the waiting writes.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

use super::{
    is_server_timestamp, DocumentFields, DocumentSnapshot, GatewayError, OwnerQuery, QuerySnapshot,
    SnapshotStream, TaskGateway, WriteOptions, OWNER_FIELD,
};

type Collection = BTreeMap<String, DocumentFields>;

#[derive(Clone, Debug)]
enum WriteOp {
    Upsert { fields: DocumentFields, merge: bool },
    Delete,
}

struct QueuedWrite {
    collection: String,
    document_id: String,
    op: WriteOp,
    ack: oneshot::Sender<Result<(), GatewayError>>,
}

struct Subscriber {
    query: OwnerQuery,
    tx: mpsc::UnboundedSender<Result<QuerySnapshot, GatewayError>>,
}

struct State {
    online: bool,
    connected: bool,
    fail_connect: bool,
    fail_writes: bool,
    collections: HashMap<String, Collection>,
    queue: Vec<QueuedWrite>,
    subscribers: Vec<Subscriber>,
}

/// Document gateway kept entirely in memory.
pub struct MemoryGateway {
    offline_persistence: bool,
    state: Mutex<State>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Replace server timestamp sentinels with the current time.
fn resolve_timestamps(mut fields: DocumentFields) -> DocumentFields {
    let now = Utc::now().to_rfc3339();
    for value in fields.values_mut() {
        if is_server_timestamp(value) {
            *value = Value::String(now.clone());
        }
    }
    fields
}

fn apply_op(collection: &mut Collection, document_id: &str, op: &WriteOp) {
    match op {
        WriteOp::Upsert { fields, merge: true } => {
            let doc = collection.entry(document_id.to_string()).or_default();
            for (key, value) in fields {
                doc.insert(key.clone(), value.clone());
            }
        }
        WriteOp::Upsert { fields, merge: false } => {
            collection.insert(document_id.to_string(), fields.clone());
        }
        WriteOp::Delete => {
            collection.remove(document_id);
        }
    }
}

fn owned_by(fields: &DocumentFields, owner_id: &str) -> bool {
    fields.get(OWNER_FIELD).and_then(Value::as_str) == Some(owner_id)
}

impl State {
    /// Confirmed documents with queued writes applied on top.
    fn local_view(&self, collection: &str) -> (Collection, HashSet<String>) {
        let mut view = self.collections.get(collection).cloned().unwrap_or_default();
        let mut pending = HashSet::new();
        for write in self.queue.iter().filter(|w| w.collection == collection) {
            apply_op(&mut view, &write.document_id, &write.op);
            pending.insert(write.document_id.clone());
        }
        (view, pending)
    }

    fn snapshot_for(&self, query: &OwnerQuery) -> QuerySnapshot {
        let (view, pending) = self.local_view(&query.collection);
        let documents = view
            .into_iter()
            .filter(|(_, fields)| owned_by(fields, &query.owner_id))
            .map(|(id, fields)| DocumentSnapshot {
                has_pending_writes: pending.contains(&id),
                id,
                fields,
            })
            .collect();
        QuerySnapshot { documents }
    }

    /// Push a fresh snapshot to every live subscriber of `collection`, pruning
    /// subscribers whose stream has been dropped.
    fn broadcast(&mut self, collection: &str) {
        let snapshots: Vec<Option<QuerySnapshot>> = self
            .subscribers
            .iter()
            .map(|sub| (sub.query.collection == collection).then(|| self.snapshot_for(&sub.query)))
            .collect();

        let mut index = 0;
        self.subscribers.retain(|sub| {
            let keep = match &snapshots[index] {
                Some(snapshot) => sub.tx.send(Ok(snapshot.clone())).is_ok(),
                None => !sub.tx.is_closed(),
            };
            index += 1;
            keep
        });
    }

    fn commit(&mut self, collection: &str, document_id: &str, op: &WriteOp) {
        let target = self.collections.entry(collection.to_string()).or_default();
        apply_op(target, document_id, op);
    }
}

impl MemoryGateway {
    /// Create an online gateway. With `offline_persistence` disabled, writes
    /// issued while offline fail immediately instead of being queued.
    pub fn new(offline_persistence: bool) -> Self {
        Self {
            offline_persistence,
            state: Mutex::new(State {
                online: true,
                connected: false,
                fail_connect: false,
                fail_writes: false,
                collections: HashMap::new(),
                queue: Vec::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_online(&self) -> bool {
        self.state().online
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Switch connectivity. Going online flushes queued writes in order and
    /// resolves their pending futures.
    pub fn set_online(&self, online: bool) {
        let mut state = self.state();
        if state.online == online {
            return;
        }
        state.online = online;
        if !online {
            info!("Memory gateway went offline");
            return;
        }

        let queued = std::mem::take(&mut state.queue);
        info!("Memory gateway back online, flushing {} queued write(s)", queued.len());
        let mut touched = HashSet::new();
        for write in queued {
            let result = if state.fail_writes {
                Err(GatewayError::Unavailable("write rejected".to_string()))
            } else {
                state.commit(&write.collection, &write.document_id, &write.op);
                Ok(())
            };
            touched.insert(write.collection.clone());
            let _ = write.ack.send(result);
        }
        for collection in touched {
            state.broadcast(&collection);
        }
    }

    /// Make every subsequent write fail with `GatewayError::Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Make `connect` fail.
    pub fn fail_connect(&self, fail: bool) {
        self.state().fail_connect = fail;
    }

    /// Server-side write that bypasses the offline queue.
    pub fn put_document(&self, collection: &str, document_id: &str, fields: DocumentFields) {
        let mut state = self.state();
        state.commit(
            collection,
            document_id,
            &WriteOp::Upsert {
                fields: resolve_timestamps(fields),
                merge: false,
            },
        );
        state.broadcast(collection);
    }

    /// Replace every document `owner_id` has in `collection` in one step,
    /// emitting a single snapshot.
    pub fn replace_owner_documents(&self, collection: &str, owner_id: &str, documents: Vec<(String, DocumentFields)>) {
        let mut state = self.state();
        let target = state.collections.entry(collection.to_string()).or_default();
        target.retain(|_, fields| !owned_by(fields, owner_id));
        for (id, mut fields) in documents {
            fields.insert(OWNER_FIELD.to_string(), Value::String(owner_id.to_string()));
            target.insert(id, resolve_timestamps(fields));
        }
        state.broadcast(collection);
    }

    /// Deliver an error to every subscriber of `collection`.
    pub fn emit_error(&self, collection: &str, error: GatewayError) {
        let mut state = self.state();
        state
            .subscribers
            .retain(|sub| sub.query.collection != collection || sub.tx.send(Err(error.clone())).is_ok());
    }

    /// Layered view of an owner's documents, as a subscriber would see it.
    pub fn documents_for(&self, collection: &str, owner_id: &str) -> Vec<DocumentSnapshot> {
        self.state().snapshot_for(&OwnerQuery::new(collection, owner_id)).documents
    }

    /// Number of writes waiting for connectivity.
    pub fn queued_writes(&self) -> usize {
        self.state().queue.len()
    }

    /// Number of subscriptions whose stream is still open.
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|sub| !sub.tx.is_closed());
        state.subscribers.len()
    }

    async fn write(&self, collection: &str, document_id: &str, op: WriteOp) -> Result<(), GatewayError> {
        let waiting = {
            let mut state = self.state();
            if state.fail_writes {
                return Err(GatewayError::Unavailable(format!("write to {collection}/{document_id} rejected")));
            }

            if state.online {
                state.commit(collection, document_id, &op);
                state.broadcast(collection);
                return Ok(());
            }

            if !self.offline_persistence {
                return Err(GatewayError::Unavailable("offline and persistence disabled".to_string()));
            }

            debug!("Queueing offline write for {collection}/{document_id}");
            let (ack, waiting) = oneshot::channel();
            state.queue.push(QueuedWrite {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
                op,
                ack,
            });
            state.broadcast(collection);
            waiting
        };

        waiting
            .await
            .unwrap_or_else(|_| Err(GatewayError::Other("write queue dropped".to_string())))
    }
}

#[async_trait]
impl TaskGateway for MemoryGateway {
    fn gateway_type(&self) -> &str {
        "memory"
    }

    async fn connect(&self) -> Result<(), GatewayError> {
        let mut state = self.state();
        if state.fail_connect {
            warn!("Memory gateway refused connection");
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    fn subscribe(&self, query: OwnerQuery) -> Result<SnapshotStream, GatewayError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        let initial = state.snapshot_for(&query);
        tx.send(Ok(initial))
            .map_err(|_| GatewayError::Other("subscriber closed before first snapshot".to_string()))?;
        state.subscribers.push(Subscriber { query, tx });
        Ok(rx)
    }

    async fn upsert(
        &self,
        collection: &str,
        document_id: &str,
        fields: DocumentFields,
        options: WriteOptions,
    ) -> Result<(), GatewayError> {
        let op = WriteOp::Upsert {
            fields: resolve_timestamps(fields),
            merge: options.merge,
        };
        self.write(collection, document_id, op).await
    }

    async fn delete(&self, collection: &str, document_id: &str) -> Result<(), GatewayError> {
        self.write(collection, document_id, WriteOp::Delete).await
    }
}
