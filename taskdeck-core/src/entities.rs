//! Core entity structures

use crate::{Priority, ProjectId, TaskId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// Maximum task title length, in characters.
pub const MAX_TITLE_LEN: usize = 255;
/// Maximum task description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Maximum project name length, in characters.
pub const MAX_PROJECT_NAME_LEN: usize = 100;
/// Maximum display name length, in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Task - the unit of work a user tracks.
/// Owned by the remote store; the client only holds read-only copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: Priority,
    pub project_id: Option<ProjectId>,
    pub completed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Project - a named grouping of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub created_at: Timestamp,
}

/// Flattened task row returned by the export query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExport {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: Priority,
    pub project_name: Option<String>,
    pub completed: bool,
    pub created_at: Timestamp,
}

/// User-editable task fields, as submitted by a create or edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: Priority,
    pub project_id: Option<ProjectId>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            priority,
            project_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: Timestamp) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Trim text fields and check length limits.
    ///
    /// A description that is blank after trimming becomes `None`.
    pub fn normalized(&self) -> Result<TaskDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::RequiredFieldMissing { field: "title" });
        }
        check_len("title", title, MAX_TITLE_LEN)?;

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(description) = description {
            check_len("description", description, MAX_DESCRIPTION_LEN)?;
        }

        Ok(TaskDraft {
            title: title.to_string(),
            description: description.map(str::to_string),
            due_date: self.due_date,
            priority: self.priority,
            project_id: self.project_id,
        })
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            priority: task.priority,
            project_id: task.project_id,
        }
    }
}

/// Trim and check a project name.
pub fn normalize_project_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field: "name" });
    }
    check_len("name", name, MAX_PROJECT_NAME_LEN)?;
    Ok(name.to_string())
}

/// Trim and check a display name.
pub fn normalize_display_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "display name",
        });
    }
    check_len("display name", name, MAX_DISPLAY_NAME_LEN)?;
    Ok(name.to_string())
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, len, max });
    }
    Ok(())
}
