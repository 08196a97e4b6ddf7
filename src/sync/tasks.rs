use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::watch;

use super::receipt::{RemoteOutcome, WriteReceipt};
use super::snapshot::{completion_fields, mark_write_failed, new_task_document, task_fields};
use super::{deliver_notifications, TaskService, TaskServiceError};
use crate::backend::{DocumentFields, WriteOptions};
use crate::entities::{Task, TaskWithSyncStatus};

/// Remote half of a mutation, dispatched after the local half.
enum RemoteWrite {
    Upsert {
        fields: DocumentFields,
        options: WriteOptions,
    },
    Delete,
}

impl RemoteWrite {
    fn label(&self) -> &'static str {
        match self {
            RemoteWrite::Upsert { options, .. } if options.merge => "merge",
            RemoteWrite::Upsert { .. } => "create",
            RemoteWrite::Delete => "delete",
        }
    }
}

impl TaskService {
    /// Adds a task to the local list and creates it remotely.
    ///
    /// Fails with [`TaskServiceError::NotAuthenticated`] without touching the
    /// list when nobody is signed in. The title is not validated here.
    pub fn add_task(&self, task: Task) -> Result<WriteReceipt, TaskServiceError> {
        let user = self.identity.current_user().ok_or(TaskServiceError::NotAuthenticated)?;
        debug!("add_task {}", task.id);

        let generation = {
            let mut inner = self.lock();
            inner.tasks.push(TaskWithSyncStatus::from(task.clone()));
            inner.notify();
            inner.generation
        };
        deliver_notifications(&self.state);

        let write = RemoteWrite::Upsert {
            fields: new_task_document(&task, &user.uid),
            options: WriteOptions::replace(),
        };
        Ok(self.dispatch(task.id, generation, true, write))
    }

    /// Replaces an existing task wholesale and merges its fields remotely.
    ///
    /// Unknown ids are ignored.
    pub fn update_task(&self, task: Task) -> WriteReceipt {
        let replaced = {
            let mut inner = self.lock();
            let generation = inner.generation;
            match inner.tasks.iter_mut().find(|t| t.id() == task.id) {
                Some(entry) => {
                    *entry = TaskWithSyncStatus::from(task.clone());
                    inner.notify();
                    Some(generation)
                }
                None => None,
            }
        };
        let Some(generation) = replaced else {
            debug!("update_task: {} not found", task.id);
            return WriteReceipt::skipped(task.id, false);
        };
        deliver_notifications(&self.state);

        let Some(user) = self.identity.current_user() else {
            debug!("update_task: no signed-in user, {} updated locally only", task.id);
            return WriteReceipt::skipped(task.id, true);
        };
        let write = RemoteWrite::Upsert {
            fields: task_fields(&task, &user.uid),
            options: WriteOptions::merge(),
        };
        self.dispatch(task.id, generation, true, write)
    }

    /// Flips the completion flag of a task and merges it remotely.
    ///
    /// Unknown ids are ignored.
    pub fn toggle_task_complete(&self, id: &str) -> WriteReceipt {
        let toggled = {
            let mut inner = self.lock();
            let generation = inner.generation;
            match inner.tasks.iter_mut().find(|t| t.id() == id) {
                Some(entry) => {
                    entry.task.is_completed = !entry.task.is_completed;
                    let is_completed = entry.task.is_completed;
                    inner.notify();
                    Some((generation, is_completed))
                }
                None => None,
            }
        };
        let Some((generation, is_completed)) = toggled else {
            debug!("toggle_task_complete: {id} not found");
            return WriteReceipt::skipped(id, false);
        };
        deliver_notifications(&self.state);

        if self.identity.current_user().is_none() {
            debug!("toggle_task_complete: no signed-in user, {id} toggled locally only");
            return WriteReceipt::skipped(id, true);
        }
        let write = RemoteWrite::Upsert {
            fields: completion_fields(is_completed),
            options: WriteOptions::merge(),
        };
        self.dispatch(id.to_string(), generation, true, write)
    }

    /// Removes a task locally and deletes it remotely when someone is signed in.
    pub fn remove_task(&self, id: &str) -> WriteReceipt {
        let (generation, removed) = {
            let mut inner = self.lock();
            let before = inner.tasks.len();
            inner.tasks.retain(|t| t.id() != id);
            let removed = inner.tasks.len() != before;
            inner.notify();
            (inner.generation, removed)
        };
        deliver_notifications(&self.state);

        if self.identity.current_user().is_none() {
            debug!("remove_task: no signed-in user, remote delete of {id} skipped");
            return WriteReceipt::skipped(id, removed);
        }
        self.dispatch(id.to_string(), generation, removed, RemoteWrite::Delete)
    }

    /// Spawns the remote write and returns a receipt tracking it.
    ///
    /// Failures are logged and, for upserts, flag the task with the error
    /// sync status. Nothing is rolled back.
    fn dispatch(&self, task_id: String, generation: u64, local_applied: bool, write: RemoteWrite) -> WriteReceipt {
        let (tx, rx) = watch::channel(RemoteOutcome::Pending);
        let receipt = WriteReceipt::new(task_id.clone(), local_applied, rx);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("No async runtime available, remote {} of {task_id} dropped", write.label());
            tx.send_replace(RemoteOutcome::Failed("no async runtime".to_string()));
            return receipt;
        };

        let gateway = Arc::clone(&self.gateway);
        let collection = self.collection.clone();
        let state = Arc::downgrade(&self.state);
        runtime.spawn(async move {
            let label = write.label();
            let result = match write {
                RemoteWrite::Upsert { fields, options } => gateway.upsert(&collection, &task_id, fields, options).await,
                RemoteWrite::Delete => gateway.delete(&collection, &task_id).await,
            };
            match result {
                Ok(()) => {
                    info!("Remote {label} of task {task_id} confirmed");
                    tx.send_replace(RemoteOutcome::Confirmed);
                }
                Err(e) => {
                    error!("Remote {label} of task {task_id} failed: {e}");
                    if let Some(state) = state.upgrade() {
                        mark_write_failed(&state, generation, &task_id, &e);
                    }
                    tx.send_replace(RemoteOutcome::Failed(e.to_string()));
                }
            }
        });
        receipt
    }
}
