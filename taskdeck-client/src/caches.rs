//! The client's query caches and the fetchers that fill them.

use crate::invalidation::{Mutation, Namespace, Settlement};
use crate::remote::RemoteStore;
use async_trait::async_trait;
use std::sync::Arc;
use taskdeck_cache::{
    CacheConfig, DisplayNameKey, ProjectsKey, QueryCache, QueryFetcher, TaskListKey,
};
use taskdeck_core::{PaginatedResult, Project, ProjectId, RemoteError};
use tracing::{debug, warn};

/// Fills task-list entries, rejecting pages that break their own invariants.
pub struct TaskListFetcher {
    remote: Arc<dyn RemoteStore>,
}

#[async_trait]
impl QueryFetcher<TaskListKey, PaginatedResult> for TaskListFetcher {
    async fn fetch(&self, key: &TaskListKey) -> Result<PaginatedResult, RemoteError> {
        let page = self
            .remote
            .list_tasks(key.filter(), key.page(), key.page_size())
            .await?;
        if let Err(err) = page.validate(key.page_size()) {
            warn!(key = ?key, error = %err, "Remote returned a malformed page");
            return Err(RemoteError::rejected(format!("Malformed response: {}", err)));
        }
        Ok(page)
    }
}

pub struct ProjectsFetcher {
    remote: Arc<dyn RemoteStore>,
}

#[async_trait]
impl QueryFetcher<ProjectsKey, Vec<Project>> for ProjectsFetcher {
    async fn fetch(&self, _key: &ProjectsKey) -> Result<Vec<Project>, RemoteError> {
        self.remote.list_projects().await
    }
}

pub struct DisplayNameFetcher {
    remote: Arc<dyn RemoteStore>,
}

#[async_trait]
impl QueryFetcher<DisplayNameKey, Option<String>> for DisplayNameFetcher {
    async fn fetch(&self, _key: &DisplayNameKey) -> Result<Option<String>, RemoteError> {
        self.remote.get_display_name().await
    }
}

/// One cache per namespace, all backed by the same remote store.
#[derive(Clone)]
pub struct Caches {
    pub tasks: QueryCache<TaskListKey, PaginatedResult>,
    pub projects: QueryCache<ProjectsKey, Vec<Project>>,
    pub display_name: QueryCache<DisplayNameKey, Option<String>>,
}

impl Caches {
    pub fn new(remote: Arc<dyn RemoteStore>, config: CacheConfig) -> Self {
        Self {
            tasks: QueryCache::new(
                "tasks",
                Arc::new(TaskListFetcher {
                    remote: Arc::clone(&remote),
                }),
                config.clone(),
            ),
            projects: QueryCache::new(
                "projects",
                Arc::new(ProjectsFetcher {
                    remote: Arc::clone(&remote),
                }),
                config.clone(),
            ),
            display_name: QueryCache::new(
                "display_name",
                Arc::new(DisplayNameFetcher { remote }),
                config,
            ),
        }
    }

    /// Invalidate every entry of `namespace`.
    pub fn invalidate(&self, namespace: Namespace) -> usize {
        match namespace {
            Namespace::Tasks => self.tasks.invalidate_all(),
            Namespace::Projects => self.projects.invalidate_all(),
            Namespace::DisplayName => self.display_name.invalidate_all(),
        }
    }

    /// Apply the invalidation policy of `mutation` for `settlement`.
    pub fn settle(&self, mutation: Mutation, settlement: Settlement) {
        for namespace in mutation.invalidates(settlement) {
            let invalidated = self.invalidate(*namespace);
            debug!(
                mutation = mutation.as_str(),
                namespace = namespace.as_str(),
                ?settlement,
                invalidated,
                "Invalidated namespace"
            );
        }
    }

    /// Drop task-list entries scoped to a project that no longer exists.
    pub fn forget_project(&self, project_id: ProjectId) -> usize {
        let removed = self.tasks.remove(|key| key.is_scoped_to(project_id));
        debug!(project_id = %project_id, removed, "Dropped task lists of deleted project");
        removed
    }

    /// Drop every cached entry in every namespace.
    pub fn clear(&self) {
        self.tasks.clear();
        self.projects.clear();
        self.display_name.clear();
    }
}
