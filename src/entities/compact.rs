//! Short-key task encoding.
//!
//! Field names are single letters and levels are single characters, which
//! keeps exported task lists small.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::task::{Complexity, Task, Urgency};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompactTask {
    pub i: String,
    pub t: String,
    pub c: char,
    pub u: char,
    /// Creation time in milliseconds since the Unix epoch.
    pub d: i64,
    /// 1 when completed, 0 otherwise.
    pub f: u8,
}

/// Error returned when a compact record cannot be turned back into a task.
#[derive(Debug, thiserror::Error)]
pub enum CompactError {
    #[error("invalid level code '{0}'")]
    Level(char),
    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
}

fn level_code(level: &str) -> char {
    level.chars().next().unwrap_or('m')
}

impl From<&Task> for CompactTask {
    fn from(task: &Task) -> Self {
        Self {
            i: task.id.clone(),
            t: task.title.clone(),
            c: level_code(task.complexity.as_str()),
            u: level_code(task.urgency.as_str()),
            d: task.created_at.timestamp_millis(),
            f: u8::from(task.is_completed),
        }
    }
}

impl TryFrom<CompactTask> for Task {
    type Error = CompactError;

    fn try_from(compact: CompactTask) -> Result<Self, Self::Error> {
        let complexity: Complexity = compact
            .c
            .to_string()
            .parse()
            .map_err(|_| CompactError::Level(compact.c))?;
        let urgency: Urgency = compact
            .u
            .to_string()
            .parse()
            .map_err(|_| CompactError::Level(compact.u))?;
        let created_at = Utc
            .timestamp_millis_opt(compact.d)
            .single()
            .ok_or(CompactError::Timestamp(compact.d))?;

        Ok(Task {
            id: compact.i,
            title: compact.t,
            complexity,
            urgency,
            created_at,
            is_completed: compact.f == 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_levels_as_single_letters() {
        let mut task = Task::with_id("42", "Water plants", Complexity::Low, Urgency::High);
        task.is_completed = true;
        let compact = CompactTask::from(&task);
        assert_eq!(compact.c, 'l');
        assert_eq!(compact.u, 'h');
        assert_eq!(compact.f, 1);

        let json = serde_json::to_string(&compact).unwrap();
        assert!(json.contains("\"i\":\"42\""));
    }

    #[test]
    fn rejects_unknown_level_code() {
        let compact = CompactTask {
            i: "1".into(),
            t: "x".into(),
            c: 'z',
            u: 'l',
            d: 0,
            f: 0,
        };
        assert!(matches!(Task::try_from(compact), Err(CompactError::Level('z'))));
    }
}
