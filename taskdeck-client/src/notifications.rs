//! Transient user notifications.

use chrono::{DateTime, Utc};

pub const TASK_COMPLETED: &str = "Task completed";
pub const TASK_MARKED_INCOMPLETE: &str = "Task marked incomplete";
pub const FAILED_TO_UPDATE_TASK: &str = "Failed to update task";
pub const FAILED_TO_DELETE_TASK: &str = "Failed to delete task";
pub const FAILED_TO_DELETE_PROJECT: &str = "Failed to delete project";
pub const NO_TASKS_TO_EXPORT: &str = "No tasks to export";
pub const TASKS_EXPORTED: &str = "Tasks exported";
pub const FAILED_TO_EXPORT_TASKS: &str = "Failed to export tasks";

/// Fallbacks for inline form errors that carry no message of their own.
pub const FAILED_TO_CREATE_TASK: &str = "Failed to create task";
pub const FAILED_TO_CREATE_PROJECT: &str = "Failed to create project";
pub const FAILED_TO_RENAME_PROJECT: &str = "Failed to rename project";
pub const FAILED_TO_UPDATE_DISPLAY_NAME: &str = "Failed to update display name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Retry,
    Dismiss,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub action: Option<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            action: None,
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Notice shown when a toggle is issued, before the store answers.
    pub fn toggle_issued(now_completed: bool) -> Self {
        Self::success(if now_completed {
            TASK_COMPLETED
        } else {
            TASK_MARKED_INCOMPLETE
        })
    }
}

/// Queue of notifications not yet shown.
#[derive(Debug, Default)]
pub struct Notifications {
    queue: Vec<Notification>,
}

impl Notifications {
    pub fn push(&mut self, notification: Notification) {
        self.queue.push(notification);
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.queue)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(|n| n.message.as_str())
    }
}
