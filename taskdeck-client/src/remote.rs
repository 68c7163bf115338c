//! The remote store seam.
//!
//! Everything the client knows about the authoritative store goes through
//! [`RemoteStore`]. The HTTP implementation lives in
//! [`crate::api_client::RestClient`]; tests substitute an in-memory store.

use async_trait::async_trait;
use taskdeck_core::{
    ApiFilter, PaginatedResult, Project, ProjectId, RemoteError, Task, TaskDraft, TaskExport,
    TaskId,
};

/// Request/response contract of the remote task store.
///
/// Every method may fail with a [`RemoteError`]; callers do not distinguish
/// failure kinds beyond the message they surface.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// One page of tasks, already filtered, sorted and sliced. Pages are
    /// 1-indexed.
    async fn list_tasks(
        &self,
        filter: &ApiFilter,
        page: u32,
        page_size: u32,
    ) -> Result<PaginatedResult, RemoteError>;

    async fn create_task(&self, fields: &TaskDraft) -> Result<Task, RemoteError>;

    async fn update_task(&self, id: TaskId, fields: &TaskDraft) -> Result<Task, RemoteError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError>;

    /// Flip the completion flag of a task and return it as stored.
    async fn toggle_task_complete(&self, id: TaskId) -> Result<Task, RemoteError>;

    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError>;

    async fn create_project(&self, name: &str) -> Result<Project, RemoteError>;

    async fn rename_project(&self, id: ProjectId, name: &str) -> Result<Project, RemoteError>;

    async fn delete_project(&self, id: ProjectId) -> Result<(), RemoteError>;

    /// Every task matching `filter`, unpaginated.
    async fn export_tasks(&self, filter: &ApiFilter) -> Result<Vec<TaskExport>, RemoteError>;

    async fn get_display_name(&self) -> Result<Option<String>, RemoteError>;

    async fn set_display_name(&self, name: &str) -> Result<(), RemoteError>;
}
