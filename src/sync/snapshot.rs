//! Conversion between tasks and gateway documents, and snapshot reconciliation.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::Value;
use std::sync::Mutex;

use super::{deliver_notifications, lock_state, Inner};
use crate::backend::{server_timestamp, DocumentFields, DocumentSnapshot, GatewayError, QuerySnapshot, OWNER_FIELD};
use crate::entities::{SyncStatus, Task, TaskWithSyncStatus};

/// Full document written when a task is created.
pub fn new_task_document(task: &Task, owner_id: &str) -> DocumentFields {
    let mut fields = task_fields(task, owner_id);
    fields.insert("createdAt".to_string(), server_timestamp());
    fields
}

/// Mutable fields written when a task is edited.
pub fn task_fields(task: &Task, owner_id: &str) -> DocumentFields {
    let mut fields = DocumentFields::new();
    fields.insert("id".to_string(), Value::String(task.id.clone()));
    fields.insert("title".to_string(), Value::String(task.title.clone()));
    fields.insert("complexity".to_string(), Value::String(task.complexity.to_string()));
    fields.insert("urgency".to_string(), Value::String(task.urgency.to_string()));
    fields.insert("isCompleted".to_string(), Value::Bool(task.is_completed));
    fields.insert(OWNER_FIELD.to_string(), Value::String(owner_id.to_string()));
    fields.insert("lastModified".to_string(), server_timestamp());
    fields
}

/// Patch written when only the completion flag changes.
pub fn completion_fields(is_completed: bool) -> DocumentFields {
    let mut fields = DocumentFields::new();
    fields.insert("isCompleted".to_string(), Value::Bool(is_completed));
    fields.insert("lastModified".to_string(), server_timestamp());
    fields
}

fn parse_level<T: std::str::FromStr>(fields: &DocumentFields, key: &str) -> Option<T> {
    fields.get(key).and_then(Value::as_str).and_then(|s| s.parse().ok())
}

fn parse_created_at(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(now),
        _ => now,
    }
}

/// Builds a cache entry from a snapshot document.
///
/// Returns `None` for documents that cannot be shown as a task: missing title,
/// or a complexity or urgency outside the three known levels.
pub fn task_from_document(doc: &DocumentSnapshot, now: DateTime<Utc>) -> Option<TaskWithSyncStatus> {
    let fields = &doc.fields;
    let title = fields.get("title").and_then(Value::as_str)?;
    let complexity = parse_level(fields, "complexity")?;
    let urgency = parse_level(fields, "urgency")?;

    Some(TaskWithSyncStatus {
        task: Task {
            id: doc.id.clone(),
            title: title.to_string(),
            complexity,
            urgency,
            created_at: parse_created_at(fields.get("createdAt"), now),
            is_completed: fields.get("isCompleted").and_then(Value::as_bool).unwrap_or(false),
        },
        sync_status: if doc.has_pending_writes {
            SyncStatus::Pending
        } else {
            SyncStatus::Synced
        },
        last_sync_attempt: Some(now),
    })
}

/// Replaces the local list with the contents of `snapshot` and notifies.
///
/// Snapshots belonging to an earlier session are dropped.
pub(crate) fn apply_snapshot(state: &Mutex<Inner>, generation: u64, owner_id: &str, snapshot: QuerySnapshot) {
    let now = Utc::now();
    let tasks: Vec<TaskWithSyncStatus> = snapshot
        .documents
        .iter()
        .filter(|doc| match doc.fields.get(OWNER_FIELD).and_then(Value::as_str) {
            Some(owner) => owner == owner_id,
            None => true,
        })
        .filter_map(|doc| {
            let task = task_from_document(doc, now);
            if task.is_none() {
                warn!("Skipping malformed task document {}", doc.id);
            }
            task
        })
        .collect();

    {
        let mut inner = lock_state(state);
        if inner.generation != generation || !inner.initialized {
            return;
        }
        inner.tasks = tasks;
        info!("Tasks updated from gateway: {} task(s)", inner.tasks.len());
        inner.notify();
    }
    deliver_notifications(state);
}

/// Flags a task whose remote write failed, if it is still in the list.
pub(crate) fn mark_write_failed(state: &Mutex<Inner>, generation: u64, task_id: &str, error: &GatewayError) {
    {
        let mut inner = lock_state(state);
        if inner.generation != generation {
            return;
        }
        let Some(task) = inner.tasks.iter_mut().find(|t| t.id() == task_id) else {
            return;
        };
        task.sync_status = SyncStatus::Error;
        task.last_sync_attempt = Some(Utc::now());
        warn!("Task {task_id} marked as failed to sync: {error}");
        inner.notify();
    }
    deliver_notifications(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Complexity, Urgency};
    use serde_json::json;

    fn doc(id: &str, value: Value, pending: bool) -> DocumentSnapshot {
        DocumentSnapshot {
            id: id.to_string(),
            fields: value.as_object().cloned().unwrap_or_default(),
            has_pending_writes: pending,
        }
    }

    #[test]
    fn pending_writes_map_to_pending_status() {
        let now = Utc::now();
        let d = doc(
            "1",
            json!({"title": "Buy milk", "complexity": "low", "urgency": "high", "isCompleted": false}),
            true,
        );
        let task = task_from_document(&d, now).unwrap();
        assert_eq!(task.sync_status, SyncStatus::Pending);
        assert_eq!(task.complexity, Complexity::Low);
        assert_eq!(task.urgency, Urgency::High);
        assert_eq!(task.created_at, now);
        assert_eq!(task.last_sync_attempt, Some(now));
    }

    #[test]
    fn created_at_is_read_from_rfc3339() {
        let d = doc(
            "1",
            json!({"title": "t", "complexity": "medium", "urgency": "medium", "createdAt": "2025-03-01T10:00:00Z"}),
            false,
        );
        let task = task_from_document(&d, Utc::now()).unwrap();
        assert_eq!(task.created_at.to_rfc3339(), "2025-03-01T10:00:00+00:00");
        assert_eq!(task.sync_status, SyncStatus::Synced);
    }

    #[test]
    fn unknown_levels_are_rejected() {
        let d = doc("1", json!({"title": "t", "complexity": "extreme", "urgency": "low"}), false);
        assert!(task_from_document(&d, Utc::now()).is_none());
        let d = doc("2", json!({"complexity": "low", "urgency": "low"}), false);
        assert!(task_from_document(&d, Utc::now()).is_none());
    }

    #[test]
    fn edit_fields_cover_the_mutable_schema() {
        let task = Task::with_id("9", "Pay rent", Complexity::Medium, Urgency::High);
        let fields = task_fields(&task, "u1");
        for key in ["id", "title", "complexity", "urgency", "isCompleted", "userId", "lastModified"] {
            assert!(fields.contains_key(key), "missing {key}");
        }
        assert!(!fields.contains_key("createdAt"));
        assert!(new_task_document(&task, "u1").contains_key("createdAt"));
        assert_eq!(completion_fields(true).len(), 2);
    }
}
