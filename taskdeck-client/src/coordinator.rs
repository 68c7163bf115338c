//! Mutation coordinator.
//!
//! Every write to the remote store goes through [`MutationCoordinator`], which
//! applies the invalidation policy of [`crate::invalidation`] once the call
//! settles. Form-gated mutations never touch cached data before the store
//! answers. Completion toggles are optimistic: the cached pages flip at once
//! and roll back to an exact snapshot if the store refuses.
//!
//! Toggles for one task coalesce. While a chain of toggles for a task is in
//! flight, further toggles only flip the cached state and bump a request
//! counter; when the in-flight call returns, one follow-up call is sent if
//! the store's state still differs in parity from what was requested. Every
//! caller of the chain observes the same final outcome.

use crate::caches::Caches;
use crate::error::MutationError;
use crate::invalidation::{Mutation, Settlement};
use crate::remote::RemoteStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use taskdeck_cache::{CacheConfig, CacheResult, CacheSnapshot, DisplayNameKey, ProjectsKey, TaskListKey};
use taskdeck_core::{
    normalize_display_name, normalize_project_name, ApiFilter, ExportOutcome, PaginatedResult,
    Project, ProjectId, RemoteError, Task, TaskDraft, TaskId, ValidationError,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

type ToggleResult = Result<ToggleOutcome, RemoteError>;

/// Final state of a toggle chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The task as last returned by the store. `None` when the toggles
    /// cancelled out before any call was sent.
    pub task: Option<Task>,
    /// Remote calls the chain issued.
    pub calls: u32,
}

struct ToggleChain {
    /// Distinguishes this chain from earlier chains for the same task whose
    /// drivers may still be waiting on the store.
    generation: u64,
    /// Toggles requested by callers.
    requested: u32,
    /// Remote calls issued, including one still in flight.
    sent: u32,
    snapshot: CacheSnapshot<TaskListKey, PaginatedResult>,
    outcome: watch::Sender<Option<ToggleResult>>,
}

impl ToggleChain {
    fn is_settled(&self) -> bool {
        self.requested % 2 == self.sent % 2
    }
}

/// A toggle that has been applied locally and is waiting on the store.
pub struct ToggleHandle {
    task_id: TaskId,
    completed: Option<bool>,
    outcome: watch::Receiver<Option<ToggleResult>>,
}

impl ToggleHandle {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Completion state shown after the optimistic flip, if any cached page
    /// holds the task.
    pub fn optimistic_completed(&self) -> Option<bool> {
        self.completed
    }

    /// Wait for the chain this toggle joined to settle.
    pub async fn wait(mut self) -> Result<ToggleOutcome, MutationError> {
        let result = match self.outcome.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        result
            .unwrap_or_else(|| Err(RemoteError::transport("Toggle abandoned before it settled")))
            .map_err(MutationError::from)
    }
}

#[derive(Clone)]
pub struct MutationCoordinator {
    remote: Arc<dyn RemoteStore>,
    caches: Caches,
    toggles: Arc<Mutex<HashMap<TaskId, ToggleChain>>>,
    next_generation: Arc<AtomicU64>,
}

impl MutationCoordinator {
    pub fn new(remote: Arc<dyn RemoteStore>, config: CacheConfig) -> Self {
        let caches = Caches::new(Arc::clone(&remote), config);
        Self {
            remote,
            caches,
            toggles: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    fn lock_toggles(&self) -> MutexGuard<'_, HashMap<TaskId, ToggleChain>> {
        self.toggles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish<T>(&self, mutation: Mutation, result: Result<T, RemoteError>) -> Result<T, MutationError> {
        match result {
            Ok(value) => {
                info!(mutation = mutation.as_str(), "Mutation succeeded");
                self.caches.settle(mutation, Settlement::Success);
                Ok(value)
            }
            Err(err) => {
                warn!(mutation = mutation.as_str(), error = %err, "Mutation failed");
                self.caches.settle(mutation, Settlement::Failure);
                Err(err.into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// One page of tasks, fetched if not fresh in the cache.
    pub async fn tasks(&self, key: &TaskListKey) -> CacheResult<Arc<PaginatedResult>> {
        self.caches.tasks.get(key).await
    }

    pub async fn projects(&self) -> CacheResult<Arc<Vec<Project>>> {
        self.caches.projects.get(&ProjectsKey).await
    }

    pub async fn display_name(&self) -> CacheResult<Arc<Option<String>>> {
        self.caches.display_name.get(&DisplayNameKey).await
    }

    /// Every task matching `filter`, projected to CSV.
    pub async fn export_tasks(&self, filter: &ApiFilter) -> Result<ExportOutcome, MutationError> {
        let rows = self.remote.export_tasks(filter).await.map_err(|err| {
            warn!(error = %err, "Export failed");
            MutationError::from(err)
        })?;
        let outcome = ExportOutcome::from_rows(&rows);
        debug!(rows = rows.len(), "Exported tasks");
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------------

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, MutationError> {
        let draft = draft.normalized()?;
        let result = self.remote.create_task(&draft).await;
        self.finish(Mutation::CreateTask, result)
    }

    pub async fn update_task(&self, id: TaskId, draft: &TaskDraft) -> Result<Task, MutationError> {
        let draft = draft.normalized()?;
        let result = self.remote.update_task(id, &draft).await;
        self.finish(Mutation::UpdateTask, result)
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), MutationError> {
        let result = self.remote.delete_task(id).await;
        self.finish(Mutation::DeleteTask, result)
    }

    /// Toggle completion of `id` and wait for the store to agree.
    pub async fn toggle_complete(&self, id: TaskId) -> Result<ToggleOutcome, MutationError> {
        self.begin_toggle(id).wait().await
    }

    /// Flip the cached completion state of `id` and start, or join, the
    /// remote toggle chain for it.
    ///
    /// The cached pages change before this returns. Must be called from
    /// within a Tokio runtime.
    pub fn begin_toggle(&self, id: TaskId) -> ToggleHandle {
        let mut chains = self.lock_toggles();
        let cancelled = self.caches.tasks.cancel(|_| true);

        if let Some(chain) = chains.get_mut(&id) {
            chain.requested += 1;
            let patched = self.flip_cached(id);
            debug!(
                task_id = %id,
                requested = chain.requested,
                sent = chain.sent,
                patched,
                cancelled,
                "Coalesced toggle into pending chain"
            );
            return ToggleHandle {
                task_id: id,
                completed: self.cached_completion(id),
                outcome: chain.outcome.subscribe(),
            };
        }

        let snapshot = self
            .caches
            .tasks
            .snapshot_matching(|_, page| page.contains(id));
        let patched = self.flip_cached(id);
        let (outcome, receiver) = watch::channel(None);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        chains.insert(
            id,
            ToggleChain {
                generation,
                requested: 1,
                sent: 0,
                snapshot,
                outcome,
            },
        );
        drop(chains);

        debug!(task_id = %id, generation, patched, cancelled, "Applied optimistic toggle");
        tokio::spawn(self.clone().drive_toggle(id, generation));
        ToggleHandle {
            task_id: id,
            completed: self.cached_completion(id),
            outcome: receiver,
        }
    }

    fn flip_cached(&self, id: TaskId) -> usize {
        self.caches
            .tasks
            .patch(|_| true, |page| page.with_completion_toggled(id))
    }

    fn cached_completion(&self, id: TaskId) -> Option<bool> {
        self.caches.tasks.keys().iter().find_map(|key| {
            let entry = self.caches.tasks.peek(key);
            entry
                .value()
                .and_then(|page| page.find(id))
                .map(|task| task.completed)
        })
    }

    /// Run the remote calls of one chain. A chain for the same task started
    /// after this one was abandoned belongs to its own driver and is never
    /// touched here.
    async fn drive_toggle(self, id: TaskId, generation: u64) {
        let mut calls = 0;
        let mut last_task = None;
        loop {
            let settled = {
                let mut chains = self.lock_toggles();
                let Some(chain) = chains
                    .get_mut(&id)
                    .filter(|chain| chain.generation == generation)
                else {
                    debug!(task_id = %id, generation, "Toggle chain dropped before it settled");
                    return;
                };
                if chain.is_settled() {
                    chains.remove(&id)
                } else {
                    chain.sent += 1;
                    None
                }
            };

            if let Some(chain) = settled {
                info!(task_id = %id, calls, requested = chain.requested, "Toggle chain settled");
                self.caches.settle(Mutation::ToggleTask, Settlement::Success);
                chain.outcome.send_replace(Some(Ok(ToggleOutcome {
                    task: last_task,
                    calls,
                })));
                return;
            }

            match self.remote.toggle_task_complete(id).await {
                Ok(task) => {
                    calls += 1;
                    last_task = Some(task);
                }
                Err(err) => {
                    let chain = {
                        let mut chains = self.lock_toggles();
                        match chains.get(&id) {
                            Some(chain) if chain.generation == generation => chains.remove(&id),
                            _ => None,
                        }
                    };
                    let Some(chain) = chain else {
                        debug!(task_id = %id, generation, error = %err, "Abandoned toggle failed");
                        return;
                    };
                    let restored = self.caches.tasks.restore(chain.snapshot);
                    warn!(task_id = %id, error = %err, restored, "Toggle failed, rolled back");
                    self.caches.settle(Mutation::ToggleTask, Settlement::Failure);
                    chain.outcome.send_replace(Some(Err(err)));
                    return;
                }
            }
        }
    }

    /// Whether a toggle chain for `id` is still waiting on the store.
    pub fn is_toggle_pending(&self, id: TaskId) -> bool {
        self.lock_toggles().contains_key(&id)
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    pub async fn create_project(&self, name: &str) -> Result<Project, MutationError> {
        let name = normalize_project_name(name)?;
        let result = self.remote.create_project(&name).await;
        self.finish(Mutation::CreateProject, result)
    }

    /// Rename a project. A name equal to the cached current name is rejected
    /// without a remote call.
    pub async fn rename_project(&self, id: ProjectId, name: &str) -> Result<Project, MutationError> {
        let name = normalize_project_name(name)?;
        let unchanged = self
            .caches
            .projects
            .peek(&ProjectsKey)
            .value()
            .and_then(|projects| projects.iter().find(|p| p.id == id))
            .is_some_and(|project| project.name == name);
        if unchanged {
            return Err(ValidationError::Unchanged { field: "name" }.into());
        }
        let result = self.remote.rename_project(id, &name).await;
        self.finish(Mutation::RenameProject, result)
    }

    /// Delete a project. Cached task lists scoped to it are dropped, not just
    /// invalidated, so nothing re-requests the deleted id.
    pub async fn delete_project(&self, id: ProjectId) -> Result<(), MutationError> {
        let result = self.remote.delete_project(id).await;
        if result.is_ok() {
            self.caches.forget_project(id);
        }
        self.finish(Mutation::DeleteProject, result)
    }

    // ------------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------------

    pub async fn set_display_name(&self, name: &str) -> Result<(), MutationError> {
        let name = normalize_display_name(name)?;
        let result = self.remote.set_display_name(&name).await;
        self.finish(Mutation::SetDisplayName, result)
    }

    /// Forget everything cached for the current identity. Pending toggle
    /// chains are abandoned and their waiters receive an error.
    pub fn sign_out(&self) {
        let abandoned = {
            let mut chains = self.lock_toggles();
            let count = chains.len();
            chains.clear();
            count
        };
        self.caches.clear();
        info!(abandoned, "Signed out, caches cleared");
    }
}
