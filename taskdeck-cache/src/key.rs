//! Cache keys for the query namespaces.
//!
//! A [`TaskListKey`] can only be built by [`derive_task_list_key`], which
//! takes the normalized [`ApiFilter`] rather than raw view state. Two view
//! states that would send the same query therefore always land on the same
//! cache entry and share one in-flight request.

use std::fmt::Debug;
use std::hash::Hash;

use taskdeck_core::{ApiFilter, ProjectId};

/// Bound satisfied by every key a [`crate::QueryCache`] can be indexed by.
///
/// Equality is structural: keys compare by value, never by identity.
pub trait CacheKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Identity of one page of the task list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskListKey {
    inner: TaskListKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TaskListKeyInner {
    filter: ApiFilter,
    page: u32,
    page_size: u32,
}

impl TaskListKey {
    pub fn filter(&self) -> &ApiFilter {
        &self.inner.filter
    }

    pub fn page(&self) -> u32 {
        self.inner.page
    }

    pub fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    /// Whether this query is scoped to `project_id`.
    pub fn is_scoped_to(&self, project_id: ProjectId) -> bool {
        self.inner.filter.project_id == Some(project_id)
    }
}

/// Derive the cache key of a task list query.
///
/// Page 0 is treated as page 1, matching the filter state's clamping.
pub fn derive_task_list_key(filter: &ApiFilter, page: u32, page_size: u32) -> TaskListKey {
    TaskListKey {
        inner: TaskListKeyInner {
            filter: filter.clone(),
            page: page.max(1),
            page_size,
        },
    }
}

/// Key of the single project-list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProjectsKey;

/// Key of the single display-name query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplayNameKey;
