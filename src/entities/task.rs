use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much effort a task takes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// How soon a task needs attention.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Error returned when a level string is not `low`, `medium` or `high`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid level '{0}', expected low, medium or high")]
pub struct ParseLevelError(pub String);

macro_rules! level_impls {
    ($ty:ident) => {
        impl $ty {
            /// Numeric rank used for ordering: low = 1, medium = 2, high = 3.
            pub fn rank(self) -> u8 {
                match self {
                    $ty::Low => 1,
                    $ty::Medium => 2,
                    $ty::High => 3,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $ty::Low => "low",
                    $ty::Medium => "medium",
                    $ty::High => "high",
                }
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                $ty::Medium
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseLevelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    "low" | "l" => Ok($ty::Low),
                    "medium" | "m" => Ok($ty::Medium),
                    "high" | "h" => Ok($ty::High),
                    _ => Err(ParseLevelError(s.to_string())),
                }
            }
        }
    };
}

level_impls!(Complexity);
level_impls!(Urgency);

/// A single to-do item as the UI sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub complexity: Complexity,
    pub urgency: Urgency,
    pub created_at: DateTime<Utc>,
    pub is_completed: bool,
}

impl Task {
    /// Create an open task with a freshly generated id.
    pub fn new(title: impl Into<String>, complexity: Complexity, urgency: Urgency) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), title, complexity, urgency)
    }

    /// Create an open task with a caller supplied id.
    pub fn with_id(id: impl Into<String>, title: impl Into<String>, complexity: Complexity, urgency: Urgency) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            complexity,
            urgency,
            created_at: Utc::now(),
            is_completed: false,
        }
    }
}

impl AsRef<Task> for Task {
    fn as_ref(&self) -> &Task {
        self
    }
}

/// Whether the backend has confirmed the last known state of a task.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Synced,
    Pending,
    Error,
}

/// A task decorated with cache-local synchronization state.
///
/// The decoration is never written to the backend. It is derived from snapshot
/// metadata or from a failed write report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithSyncStatus {
    #[serde(flatten)]
    pub task: Task,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_attempt: Option<DateTime<Utc>>,
}

impl TaskWithSyncStatus {
    pub fn id(&self) -> &str {
        &self.task.id
    }
}

impl From<Task> for TaskWithSyncStatus {
    fn from(task: Task) -> Self {
        Self {
            task,
            sync_status: SyncStatus::default(),
            last_sync_attempt: None,
        }
    }
}

impl AsRef<Task> for TaskWithSyncStatus {
    fn as_ref(&self) -> &Task {
        &self.task
    }
}

impl std::ops::Deref for TaskWithSyncStatus {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_and_rank() {
        assert_eq!("HIGH".parse::<Urgency>().unwrap(), Urgency::High);
        assert_eq!("m".parse::<Complexity>().unwrap(), Complexity::Medium);
        assert!("urgent".parse::<Urgency>().is_err());
        assert!(Complexity::Low.rank() < Complexity::Medium.rank());
        assert!(Complexity::Medium.rank() < Complexity::High.rank());
    }

    #[test]
    fn wrapped_task_has_default_status() {
        let wrapped = TaskWithSyncStatus::from(Task::with_id("1", "Buy milk", Complexity::Low, Urgency::High));
        assert_eq!(wrapped.sync_status, SyncStatus::Synced);
        assert!(wrapped.last_sync_attempt.is_none());
        assert_eq!(wrapped.id(), "1");
    }

    #[test]
    fn serializes_with_camel_case_and_flattened_task() {
        let wrapped = TaskWithSyncStatus::from(Task::with_id("7", "Call mom", Complexity::High, Urgency::Low));
        let json = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["isCompleted"], false);
        assert_eq!(json["complexity"], "high");
        assert_eq!(json["syncStatus"], "synced");
        assert!(json.get("lastSyncAttempt").is_none());
    }
}
