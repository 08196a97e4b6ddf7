pub mod compact;
pub mod task;

pub use compact::CompactTask;
pub use task::{Complexity, SyncStatus, Task, TaskWithSyncStatus, Urgency};
