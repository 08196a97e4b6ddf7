//! Constants used throughout the application
//!
//! Centralizes names, defaults and user-facing messages.

// Application identity
pub const APP_NAME: &str = "daily-organizer";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOCAL_CONFIG_FILE_NAME: &str = "daily-organizer.toml";
pub const LOG_FILE_NAME: &str = "daily-organizer.log";

// Gateway defaults
pub const DEFAULT_COLLECTION: &str = "tasks";
pub const GATEWAY_MEMORY: &str = "memory";
pub const SUPPORTED_GATEWAYS: &[&str] = &[GATEWAY_MEMORY];

// Success Messages
pub const SUCCESS_TASK_CREATED: &str = "✅ Task created";
pub const SUCCESS_TASK_UPDATED: &str = "✅ Task updated";
pub const SUCCESS_TASK_TOGGLED: &str = "✅ Task completion toggled";
pub const SUCCESS_TASK_DELETED: &str = "✅ Task deleted";

// Error Messages
pub const ERROR_TASK_CREATE_FAILED: &str = "❌ Failed to add task. Please try again.";
pub const ERROR_TASK_NOT_FOUND: &str = "❌ Task not found";
pub const ERROR_UNKNOWN_COMMAND: &str = "❌ Unknown command, type 'help'";

// Info Messages
pub const CONFIG_GENERATED: &str = "Generated default configuration file";
pub const INFO_OFFLINE: &str = "📴 Offline: changes are queued locally";
pub const INFO_ONLINE: &str = "📶 Online: queued changes are being sent";
pub const INFO_SIGNED_OUT: &str = "👋 Signed out, local tasks cleared";
