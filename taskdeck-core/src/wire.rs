//! Wire representation of the remote store contract.
//!
//! Identifiers travel as plain integers and timestamps as nanoseconds since
//! the Unix epoch. Everything here is converted to domain types with
//! `TryFrom` before it reaches a cache, so wire integers never take part in
//! cache comparisons.

use crate::{
    ApiFilter, PaginatedResult, Priority, Project, ProjectId, SortBy, Task, TaskDraft, TaskExport,
    TaskId, TaskStatus, TimeWindow, Timestamp, WireError,
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Convert a timestamp to wire nanoseconds.
pub fn to_nanos(ts: Timestamp, field: &'static str) -> Result<i64, WireError> {
    ts.timestamp_nanos_opt()
        .ok_or(WireError::TimestampOutOfRange { field })
}

/// Convert wire nanoseconds to a timestamp.
///
/// Every `i64` is representable, so this cannot fail.
pub fn from_nanos(nanos: i64) -> Timestamp {
    DateTime::from_timestamp_nanos(nanos)
}

fn opt_to_nanos(ts: Option<Timestamp>, field: &'static str) -> Result<Option<i64>, WireError> {
    ts.map(|ts| to_nanos(ts, field)).transpose()
}

fn parse_priority(raw: &str) -> Result<Priority, WireError> {
    raw.parse()
        .map_err(|_| WireError::InvalidPriority(raw.to_string()))
}

fn narrow_u32(value: u64, field: &'static str) -> Result<u32, WireError> {
    u32::try_from(value).map_err(|_| WireError::OutOfRange { field, value })
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTask {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    pub completed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<WireTask> for Task {
    type Error = WireError;

    fn try_from(wire: WireTask) -> Result<Self, Self::Error> {
        Ok(Task {
            id: TaskId::new(wire.id),
            title: wire.title,
            description: wire.description,
            due_date: wire.due_date.map(from_nanos),
            priority: parse_priority(&wire.priority)?,
            project_id: wire.project_id.map(ProjectId::new),
            completed: wire.completed,
            created_at: from_nanos(wire.created_at),
            updated_at: from_nanos(wire.updated_at),
        })
    }
}

impl TryFrom<&Task> for WireTask {
    type Error = WireError;

    fn try_from(task: &Task) -> Result<Self, Self::Error> {
        Ok(WireTask {
            id: task.id.get(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: opt_to_nanos(task.due_date, "dueDate")?,
            priority: task.priority.as_str().to_string(),
            project_id: task.project_id.map(ProjectId::get),
            completed: task.completed,
            created_at: to_nanos(task.created_at, "createdAt")?,
            updated_at: to_nanos(task.updated_at, "updatedAt")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProject {
    pub id: u64,
    pub name: String,
    pub created_at: i64,
}

impl From<WireProject> for Project {
    fn from(wire: WireProject) -> Self {
        Project {
            id: ProjectId::new(wire.id),
            name: wire.name,
            created_at: from_nanos(wire.created_at),
        }
    }
}

impl TryFrom<&Project> for WireProject {
    type Error = WireError;

    fn try_from(project: &Project) -> Result<Self, Self::Error> {
        Ok(WireProject {
            id: project.id.get(),
            name: project.name.clone(),
            created_at: to_nanos(project.created_at, "createdAt")?,
        })
    }
}

/// One page of `getTasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePage {
    pub items: Vec<WireTask>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl TryFrom<WirePage> for PaginatedResult {
    type Error = WireError;

    fn try_from(wire: WirePage) -> Result<Self, Self::Error> {
        let items = wire
            .items
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PaginatedResult {
            items,
            total_items: wire.total_items,
            total_pages: narrow_u32(wire.total_pages, "totalPages")?,
            current_page: narrow_u32(wire.current_page, "currentPage")?,
            has_next_page: wire.has_next_page,
            has_prev_page: wire.has_prev_page,
        })
    }
}

impl TryFrom<&PaginatedResult> for WirePage {
    type Error = WireError;

    fn try_from(page: &PaginatedResult) -> Result<Self, Self::Error> {
        Ok(WirePage {
            items: page
                .items
                .iter()
                .map(WireTask::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            total_items: page.total_items,
            total_pages: u64::from(page.total_pages),
            current_page: u64::from(page.current_page),
            has_next_page: page.has_next_page,
            has_prev_page: page.has_prev_page,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTaskExport {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub completed: bool,
    pub created_at: i64,
}

impl TryFrom<WireTaskExport> for TaskExport {
    type Error = WireError;

    fn try_from(wire: WireTaskExport) -> Result<Self, Self::Error> {
        Ok(TaskExport {
            id: TaskId::new(wire.id),
            title: wire.title,
            description: wire.description,
            due_date: wire.due_date.map(from_nanos),
            priority: parse_priority(&wire.priority)?,
            project_name: wire.project_name,
            completed: wire.completed,
            created_at: from_nanos(wire.created_at),
        })
    }
}

impl TryFrom<&TaskExport> for WireTaskExport {
    type Error = WireError;

    fn try_from(row: &TaskExport) -> Result<Self, Self::Error> {
        Ok(WireTaskExport {
            id: row.id.get(),
            title: row.title.clone(),
            description: row.description.clone(),
            due_date: opt_to_nanos(row.due_date, "dueDate")?,
            priority: row.priority.as_str().to_string(),
            project_name: row.project_name.clone(),
            completed: row.completed,
            created_at: to_nanos(row.created_at, "createdAt")?,
        })
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

/// Filter argument of `getTasks` and `getTasksForExport`. Absent fields mean
/// "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl From<&ApiFilter> for WireTaskFilter {
    fn from(filter: &ApiFilter) -> Self {
        WireTaskFilter {
            view: Some(filter.view),
            project_id: filter.project_id.map(ProjectId::get),
            priority: filter.priority.map(|p| p.as_str().to_string()),
            status: filter.status,
            search_query: filter.search.clone(),
            sort_by: Some(filter.sort_by),
        }
    }
}

impl TryFrom<WireTaskFilter> for ApiFilter {
    type Error = WireError;

    fn try_from(wire: WireTaskFilter) -> Result<Self, Self::Error> {
        let search = wire
            .search_query
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(ApiFilter {
            view: wire.view.unwrap_or_default(),
            project_id: wire.project_id.map(ProjectId::new),
            priority: wire.priority.as_deref().map(parse_priority).transpose()?,
            status: wire.status,
            search,
            sort_by: wire.sort_by.unwrap_or_default(),
        })
    }
}

/// Body of `createTask` and `updateTask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTaskFields {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<i64>,
    pub priority: String,
    pub project_id: Option<u64>,
}

impl TryFrom<&TaskDraft> for WireTaskFields {
    type Error = WireError;

    fn try_from(draft: &TaskDraft) -> Result<Self, Self::Error> {
        Ok(WireTaskFields {
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_date: opt_to_nanos(draft.due_date, "dueDate")?,
            priority: draft.priority.as_str().to_string(),
            project_id: draft.project_id.map(ProjectId::get),
        })
    }
}

impl TryFrom<WireTaskFields> for TaskDraft {
    type Error = WireError;

    fn try_from(wire: WireTaskFields) -> Result<Self, Self::Error> {
        Ok(TaskDraft {
            title: wire.title,
            description: wire.description,
            due_date: wire.due_date.map(from_nanos),
            priority: parse_priority(&wire.priority)?,
            project_id: wire.project_id.map(ProjectId::new),
        })
    }
}

/// Query string of `getTasks`: 1-based page and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePageRequest {
    pub page: u32,
    pub limit: u32,
}
