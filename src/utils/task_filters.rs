//! Derived views over a task list.
//!
//! Every function is pure: inputs are borrowed and a new vector is returned.
//! Sorting is stable, so tasks with the same level keep their relative order.
//! The functions accept anything that can be viewed as a [`Task`], which covers
//! both plain tasks and [`TaskWithSyncStatus`] entries from the cache.

use crate::entities::{Complexity, SyncStatus, Task, TaskWithSyncStatus, Urgency};

/// Tasks whose urgency equals `level`, in input order.
pub fn filter_by_urgency<T: AsRef<Task> + Clone>(tasks: &[T], level: Urgency) -> Vec<T> {
    tasks.iter().filter(|t| t.as_ref().urgency == level).cloned().collect()
}

/// Tasks whose complexity equals `level`, in input order.
pub fn filter_by_complexity<T: AsRef<Task> + Clone>(tasks: &[T], level: Complexity) -> Vec<T> {
    tasks.iter().filter(|t| t.as_ref().complexity == level).cloned().collect()
}

/// Tasks ordered low → medium → high complexity.
pub fn sort_by_complexity<T: AsRef<Task> + Clone>(tasks: &[T]) -> Vec<T> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|t| t.as_ref().complexity.rank());
    sorted
}

/// Tasks ordered low → medium → high urgency.
pub fn sort_by_urgency<T: AsRef<Task> + Clone>(tasks: &[T]) -> Vec<T> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|t| t.as_ref().urgency.rank());
    sorted
}

/// Splits tasks into `(active, completed)`, both in input order.
pub fn split_by_completion<T: AsRef<Task> + Clone>(tasks: &[T]) -> (Vec<T>, Vec<T>) {
    tasks.iter().cloned().partition(|t| !t.as_ref().is_completed)
}

/// Count of cache entries per sync status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
    pub pending: usize,
    pub error: usize,
}

impl SyncSummary {
    /// True when every entry is confirmed by the backend.
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.error == 0
    }
}

pub fn summarize_sync(tasks: &[TaskWithSyncStatus]) -> SyncSummary {
    tasks.iter().fold(SyncSummary::default(), |mut summary, t| {
        match t.sync_status {
            SyncStatus::Synced => summary.synced += 1,
            SyncStatus::Pending => summary.pending += 1,
            SyncStatus::Error => summary.error += 1,
        }
        summary
    })
}
