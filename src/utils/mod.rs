//! Utility modules for the Daily Organizer core.
//!
//! - [`task_filters`] - Pure sort/filter views over task lists
//! - [`datetime`] - Date formatting for task listings

pub mod datetime;
pub mod task_filters;
