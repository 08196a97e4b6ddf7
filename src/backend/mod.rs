//! Remote collection gateway abstraction.
//!
//! This module defines the interface the task cache uses to reach the durable
//! document store: owner-scoped live snapshot subscriptions plus upsert and
//! delete of single documents. The store itself (and its offline write queue)
//! lives behind this trait.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

pub mod factory;
pub mod memory;

/// Field name holding the owning user's id on every task document.
pub const OWNER_FIELD: &str = "userId";

/// Key of the sentinel object that asks the gateway to stamp server time.
pub const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// Document body: a flat JSON object keyed by field name.
pub type DocumentFields = Map<String, Value>;

/// Value that the gateway replaces with its own clock at write time.
pub fn server_timestamp() -> Value {
    let mut sentinel = Map::new();
    sentinel.insert(SERVER_TIMESTAMP_KEY.to_string(), Value::Bool(true));
    Value::Object(sentinel)
}

/// Returns true if `value` is the server timestamp sentinel.
pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.get(SERVER_TIMESTAMP_KEY) == Some(&Value::Bool(true)))
        .unwrap_or(false)
}

/// Common error types for gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The streaming channel behind a live subscription was torn down.
    #[error("Listen channel terminated: {0}")]
    ChannelTerminated(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Gateway error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Transient errors are expected during normal operation and are logged
    /// as warnings instead of errors.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::ChannelTerminated(_))
    }
}

/// Query selecting every document in a collection owned by one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerQuery {
    pub collection: String,
    pub owner_id: String,
}

impl OwnerQuery {
    pub fn new(collection: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// Options applied to a document write.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Merge the given fields into an existing document instead of replacing it.
    pub merge: bool,
}

impl WriteOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }

    pub fn replace() -> Self {
        Self { merge: false }
    }
}

/// One document as seen in a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub fields: DocumentFields,
    /// True while the document carries local writes the backend has not confirmed.
    pub has_pending_writes: bool,
}

/// Full, authoritative view of an owner's documents at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySnapshot {
    pub documents: Vec<DocumentSnapshot>,
}

/// Receiving half of a live subscription.
///
/// Dropping the stream closes the subscription; the gateway notices the closed
/// channel and stops delivering to it.
pub type SnapshotStream = mpsc::UnboundedReceiver<Result<QuerySnapshot, GatewayError>>;

/// Gateway trait that every document store backend must implement.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Returns the gateway type identifier (e.g., "memory").
    fn gateway_type(&self) -> &str;

    /// Prepare the connection and offline persistence. Safe to call repeatedly.
    async fn connect(&self) -> Result<(), GatewayError>;

    /// Open a live subscription. The current state is delivered as the first
    /// snapshot, followed by one snapshot per change.
    fn subscribe(&self, query: OwnerQuery) -> Result<SnapshotStream, GatewayError>;

    async fn upsert(
        &self,
        collection: &str,
        document_id: &str,
        fields: DocumentFields,
        options: WriteOptions,
    ) -> Result<(), GatewayError>;

    async fn delete(&self, collection: &str, document_id: &str) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_timestamp_sentinel_is_recognized() {
        assert!(is_server_timestamp(&server_timestamp()));
        assert!(!is_server_timestamp(&Value::String("2025-01-01T00:00:00Z".into())));
    }

    #[test]
    fn only_channel_termination_is_transient() {
        assert!(GatewayError::ChannelTerminated("400".into()).is_transient());
        assert!(!GatewayError::Unavailable("down".into()).is_transient());
        assert!(!GatewayError::PermissionDenied("nope".into()).is_transient());
    }
}
