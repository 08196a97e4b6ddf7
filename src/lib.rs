//! Daily Organizer - personal task organizer core
//!
//! This library provides the local task cache behind the Daily Organizer app:
//! optimistic task mutations, live reconciliation with a remote document
//! collection, and derived views over the cached list.
//!
//! # Modules
//!
//! * [`app`] - Line-oriented command front end
//! * [`auth`] - Identity provider abstraction and in-memory session
//! * [`backend`] - Remote document gateway abstraction and implementations
//! * [`config`] - Application configuration management
//! * [`entities`] - Task data model
//! * [`sync`] - Task cache service
//! * [`utils`] - Sort/filter views and formatting helpers

/// Command front end driving the task cache from text input
pub mod app;

/// Identity provider abstraction
pub mod auth;

/// Document gateway abstraction layer
pub mod backend;

/// Configuration module for managing application settings
pub mod config;

/// Application constants and default values
pub mod constants;

/// Task data model
pub mod entities;

/// Log sink setup
pub mod logger;

/// Task cache with optimistic writes and snapshot reconciliation
pub mod sync;

/// Utility functions for task views and date handling
pub mod utils;

pub use entities::{Complexity, SyncStatus, Task, TaskWithSyncStatus, Urgency};
pub use sync::{RemoteOutcome, TaskService, TaskServiceError, WriteReceipt};
