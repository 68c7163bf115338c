//! Taskdeck Test Utilities
//!
//! Shared test infrastructure for the taskdeck workspace:
//! - Proptest generators for filter state and entities
//! - Fixtures for common tasks, projects and pages
//! - [`ScriptedRemote`], an in-memory remote store with call counters,
//!   failure injection and per-operation gates
//! - Custom assertions

pub use taskdeck_core::{
    ApiFilter, FilterState, FilterUpdate, PaginatedResult, Priority, Project, ProjectId,
    RemoteError, SortBy, StatusFilter, Task, TaskDraft, TaskExport, TaskId, TimeWindow, Timestamp,
};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use taskdeck_client::RemoteStore;
use taskdeck_core::{SortDirection, SortField, TaskStatus};
use tokio::sync::Semaphore;

// ============================================================================
// SCRIPTED REMOTE STORE
// ============================================================================

/// Operations of the remote store, for counting, failing and gating calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    ToggleTask,
    ListProjects,
    CreateProject,
    RenameProject,
    DeleteProject,
    ExportTasks,
    GetDisplayName,
    SetDisplayName,
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: BTreeMap<TaskId, Task>,
    projects: BTreeMap<ProjectId, Project>,
    display_name: Option<String>,
    next_task_id: u64,
    next_project_id: u64,
}

/// In-memory remote store that filters, sorts and paginates like the real
/// one.
///
/// Every call is counted when it starts. A gated operation then waits for a
/// permit, and a scripted failure, if one is queued, is returned instead of
/// touching the stored data.
#[derive(Default)]
pub struct ScriptedRemote {
    state: Mutex<StoreState>,
    calls: Mutex<HashMap<RemoteOp, usize>>,
    failures: Mutex<HashMap<RemoteOp, VecDeque<RemoteError>>>,
    gates: Mutex<HashMap<RemoteOp, Arc<Semaphore>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A store pre-filled with `tasks` and `projects`.
    pub fn seeded(tasks: Vec<Task>, projects: Vec<Project>) -> Arc<Self> {
        let remote = Self::default();
        {
            let mut state = lock(&remote.state);
            for task in tasks {
                state.next_task_id = state.next_task_id.max(task.id.get());
                state.tasks.insert(task.id, task);
            }
            for project in projects {
                state.next_project_id = state.next_project_id.max(project.id.get());
                state.projects.insert(project.id, project);
            }
        }
        Arc::new(remote)
    }

    pub fn as_remote(self: &Arc<Self>) -> Arc<dyn RemoteStore> {
        Arc::clone(self) as Arc<dyn RemoteStore>
    }

    /// Calls of `op` started so far.
    pub fn calls(&self, op: RemoteOp) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Fail the next call of `op` with `error`. Queued failures are used in
    /// order.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        lock(&self.failures).entry(op).or_default().push_back(error);
    }

    /// Make calls of `op` wait until [`ScriptedRemote::release`] grants them
    /// a permit.
    pub fn hold(&self, op: RemoteOp) {
        lock(&self.gates)
            .entry(op)
            .or_insert_with(|| Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held calls of `op` proceed.
    pub fn release(&self, op: RemoteOp, count: usize) {
        if let Some(gate) = lock(&self.gates).get(&op) {
            gate.add_permits(count);
        }
    }

    /// Stop holding `op` and let every waiting call through.
    pub fn open(&self, op: RemoteOp) {
        if let Some(gate) = lock(&self.gates).remove(&op) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        lock(&self.state).tasks.get(&id).cloned()
    }

    pub fn task_count(&self) -> usize {
        lock(&self.state).tasks.len()
    }

    pub fn display_name(&self) -> Option<String> {
        lock(&self.state).display_name.clone()
    }

    async fn enter(&self, op: RemoteOp) -> Result<(), RemoteError> {
        *lock(&self.calls).entry(op).or_default() += 1;
        let gate = lock(&self.gates).get(&op).cloned();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| RemoteError::transport("gate closed"))?;
            permit.forget();
        }
        match lock(&self.failures).get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn matching(&self, filter: &ApiFilter) -> Vec<Task> {
        let state = lock(&self.state);
        let now = Utc::now();
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| filter.project_id.map_or(true, |id| task.project_id == Some(id)))
            .filter(|task| filter.priority.map_or(true, |p| task.priority == p))
            .filter(|task| match filter.status {
                None => true,
                Some(TaskStatus::Active) => !task.completed,
                Some(TaskStatus::Completed) => task.completed,
            })
            .filter(|task| match filter.view {
                TimeWindow::All => true,
                TimeWindow::Today => task.due_date.is_some_and(|due| due.date_naive() == now.date_naive()),
                TimeWindow::Upcoming => task.due_date.is_some_and(|due| due.date_naive() > now.date_naive()),
            })
            .filter(|task| {
                search.as_deref().map_or(true, |needle| {
                    task.title.to_lowercase().contains(needle)
                        || task
                            .description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(needle))
                })
            })
            .cloned()
            .collect();
        sort_tasks(&mut tasks, filter.sort_by);
        tasks
    }
}

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

/// Order tasks the way the remote store does. Ties fall back to id.
pub fn sort_tasks(tasks: &mut [Task], sort_by: SortBy) {
    tasks.sort_by(|a, b| {
        let ordering = match sort_by.field() {
            // Tasks without a due date sort last in both directions.
            SortField::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => {
                    let ord = x.cmp(&y);
                    if sort_by.direction() == SortDirection::Desc {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            },
            field => {
                let ord = match field {
                    SortField::Priority => priority_rank(a.priority).cmp(&priority_rank(b.priority)),
                    SortField::Created => a.created_at.cmp(&b.created_at),
                    _ => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
                };
                if sort_by.direction() == SortDirection::Desc {
                    ord.reverse()
                } else {
                    ord
                }
            }
        };
        ordering.then(a.id.cmp(&b.id))
    });
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn list_tasks(
        &self,
        filter: &ApiFilter,
        page: u32,
        page_size: u32,
    ) -> Result<PaginatedResult, RemoteError> {
        self.enter(RemoteOp::ListTasks).await?;
        let tasks = self.matching(filter);
        let total = tasks.len() as u64;
        let start = (page.max(1) as usize - 1) * page_size as usize;
        let items = tasks.into_iter().skip(start).take(page_size as usize).collect();
        Ok(PaginatedResult::from_page(items, total, page.max(1), page_size))
    }

    async fn create_task(&self, fields: &TaskDraft) -> Result<Task, RemoteError> {
        self.enter(RemoteOp::CreateTask).await?;
        let mut state = lock(&self.state);
        state.next_task_id += 1;
        let id = TaskId::new(state.next_task_id);
        let now = Utc::now();
        let task = Task {
            id,
            title: fields.title.clone(),
            description: fields.description.clone(),
            due_date: fields.due_date,
            priority: fields.priority,
            project_id: fields.project_id,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, fields: &TaskDraft) -> Result<Task, RemoteError> {
        self.enter(RemoteOp::UpdateTask).await?;
        let mut state = lock(&self.state);
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| RemoteError::rejected("Task not found"))?;
        task.title = fields.title.clone();
        task.description = fields.description.clone();
        task.due_date = fields.due_date;
        task.priority = fields.priority;
        task.project_id = fields.project_id;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), RemoteError> {
        self.enter(RemoteOp::DeleteTask).await?;
        lock(&self.state)
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::rejected("Task not found"))
    }

    async fn toggle_task_complete(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.enter(RemoteOp::ToggleTask).await?;
        let mut state = lock(&self.state);
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or_else(|| RemoteError::rejected("Task not found"))?;
        task.completed = !task.completed;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError> {
        self.enter(RemoteOp::ListProjects).await?;
        Ok(lock(&self.state).projects.values().cloned().collect())
    }

    async fn create_project(&self, name: &str) -> Result<Project, RemoteError> {
        self.enter(RemoteOp::CreateProject).await?;
        let mut state = lock(&self.state);
        if state.projects.values().any(|p| p.name == name) {
            return Err(RemoteError::rejected("Project name already exists"));
        }
        state.next_project_id += 1;
        let project = Project {
            id: ProjectId::new(state.next_project_id),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn rename_project(&self, id: ProjectId, name: &str) -> Result<Project, RemoteError> {
        self.enter(RemoteOp::RenameProject).await?;
        let mut state = lock(&self.state);
        if state.projects.values().any(|p| p.id != id && p.name == name) {
            return Err(RemoteError::rejected("Project name already exists"));
        }
        let project = state
            .projects
            .get_mut(&id)
            .ok_or_else(|| RemoteError::rejected("Project not found"))?;
        project.name = name.to_string();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), RemoteError> {
        self.enter(RemoteOp::DeleteProject).await?;
        let mut state = lock(&self.state);
        state
            .projects
            .remove(&id)
            .ok_or_else(|| RemoteError::rejected("Project not found"))?;
        state.tasks.retain(|_, task| task.project_id != Some(id));
        Ok(())
    }

    async fn export_tasks(&self, filter: &ApiFilter) -> Result<Vec<TaskExport>, RemoteError> {
        self.enter(RemoteOp::ExportTasks).await?;
        let tasks = self.matching(filter);
        let state = lock(&self.state);
        Ok(tasks
            .into_iter()
            .map(|task| TaskExport {
                id: task.id,
                project_name: task
                    .project_id
                    .and_then(|id| state.projects.get(&id))
                    .map(|p| p.name.clone()),
                title: task.title,
                description: task.description,
                due_date: task.due_date,
                priority: task.priority,
                completed: task.completed,
                created_at: task.created_at,
            })
            .collect())
    }

    async fn get_display_name(&self) -> Result<Option<String>, RemoteError> {
        self.enter(RemoteOp::GetDisplayName).await?;
        Ok(lock(&self.state).display_name.clone())
    }

    async fn set_display_name(&self, name: &str) -> Result<(), RemoteError> {
        self.enter(RemoteOp::SetDisplayName).await?;
        lock(&self.state).display_name = Some(name.to_string());
        Ok(())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for filter state and entities.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_task_id() -> impl Strategy<Value = TaskId> {
        (1u64..10_000).prop_map(TaskId::new)
    }

    pub fn arb_project_id() -> impl Strategy<Value = ProjectId> {
        (1u64..100).prop_map(ProjectId::new)
    }

    /// Timestamps between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![Just(Priority::High), Just(Priority::Medium), Just(Priority::Low)]
    }

    pub fn arb_time_window() -> impl Strategy<Value = TimeWindow> {
        prop_oneof![
            Just(TimeWindow::All),
            Just(TimeWindow::Today),
            Just(TimeWindow::Upcoming)
        ]
    }

    pub fn arb_status_filter() -> impl Strategy<Value = StatusFilter> {
        prop_oneof![
            Just(StatusFilter::All),
            Just(StatusFilter::Active),
            Just(StatusFilter::Completed)
        ]
    }

    pub fn arb_sort_by() -> impl Strategy<Value = SortBy> {
        prop::sample::select(SortBy::all().to_vec())
    }

    /// Search text, including blank and padded input.
    pub fn arb_search_query() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            "[a-z]{1,8}",
            "[a-z]{1,8}".prop_map(|s| format!("  {}  ", s)),
        ]
    }

    /// Any filter update except an explicit page change.
    pub fn arb_non_page_update() -> impl Strategy<Value = FilterUpdate> {
        prop_oneof![
            arb_time_window().prop_map(FilterUpdate::TimeWindow),
            prop::option::of(arb_project_id()).prop_map(FilterUpdate::Project),
            arb_search_query().prop_map(FilterUpdate::Search),
            prop::option::of(arb_priority()).prop_map(FilterUpdate::Priority),
            arb_status_filter().prop_map(FilterUpdate::Status),
            arb_sort_by().prop_map(FilterUpdate::Sort),
            Just(FilterUpdate::Clear),
        ]
    }

    pub fn arb_filter_update() -> impl Strategy<Value = FilterUpdate> {
        prop_oneof![
            4 => arb_non_page_update(),
            1 => (0u32..20).prop_map(FilterUpdate::Page),
        ]
    }

    /// A filter state reached through a sequence of updates.
    pub fn arb_filter_state() -> impl Strategy<Value = FilterState> {
        prop::collection::vec(arb_filter_update(), 0..12).prop_map(|updates| {
            let mut state = FilterState::new();
            for update in updates {
                state.apply(update);
            }
            state
        })
    }

    pub fn arb_task() -> impl Strategy<Value = Task> {
        (
            arb_task_id(),
            "[A-Za-z ]{1,40}",
            prop::option::of("[A-Za-z ,\"]{0,60}"),
            prop::option::of(arb_timestamp()),
            arb_priority(),
            prop::option::of(arb_project_id()),
            any::<bool>(),
            arb_timestamp(),
        )
            .prop_map(
                |(id, title, description, due_date, priority, project_id, completed, created_at)| Task {
                    id,
                    title,
                    description,
                    due_date,
                    priority,
                    project_id,
                    completed,
                    created_at,
                    updated_at: created_at,
                },
            )
    }

    /// Tasks with distinct ids.
    pub fn arb_tasks(max: usize) -> impl Strategy<Value = Vec<Task>> {
        prop::collection::vec(arb_task(), 0..max).prop_map(|tasks| {
            tasks
                .into_iter()
                .enumerate()
                .map(|(i, mut task)| {
                    task.id = TaskId::new(i as u64 + 1);
                    task
                })
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities for common scenarios.

    use super::*;

    /// Fixed instant all fixtures are created relative to.
    pub fn base_time() -> Timestamp {
        chrono::DateTime::from_timestamp(1_767_225_600, 0).unwrap_or_else(Utc::now)
    }

    /// An active medium-priority task created `id` seconds after
    /// [`base_time`].
    pub fn task(id: u64, title: &str) -> Task {
        let created_at = base_time() + chrono::Duration::seconds(id as i64);
        Task {
            id: TaskId::new(id),
            title: title.to_string(),
            description: None,
            due_date: None,
            priority: Priority::Medium,
            project_id: None,
            completed: false,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn completed_task(id: u64, title: &str) -> Task {
        Task {
            completed: true,
            ..task(id, title)
        }
    }

    pub fn task_in_project(id: u64, title: &str, project_id: u64) -> Task {
        Task {
            project_id: Some(ProjectId::new(project_id)),
            ..task(id, title)
        }
    }

    pub fn project(id: u64, name: &str) -> Project {
        Project {
            id: ProjectId::new(id),
            name: name.to_string(),
            created_at: base_time(),
        }
    }

    /// Page `page` of `items` at `page_size`, given the collection total.
    pub fn paginated(items: Vec<Task>, total_items: u64, page: u32, page_size: u32) -> PaginatedResult {
        PaginatedResult::from_page(items, total_items, page, page_size)
    }

    /// `count` active tasks titled `task 1` ... `task N`.
    pub fn numbered_tasks(count: u64) -> Vec<Task> {
        (1..=count).map(|id| task(id, &format!("task {id}"))).collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for taskdeck-specific validation.

    use super::*;
    use taskdeck_client::MutationError;
    use taskdeck_core::ValidationError;

    /// Assert that the filter state points at the first page.
    #[track_caller]
    pub fn assert_first_page(state: &FilterState) {
        assert_eq!(state.current_page(), 1, "Expected page 1, state: {:?}", state);
    }

    /// Assert that filters are at their cleared defaults.
    #[track_caller]
    pub fn assert_cleared(state: &FilterState) {
        assert_eq!(state.time_window(), TimeWindow::All);
        assert_eq!(state.search_query(), "");
        assert_eq!(state.status_filter(), StatusFilter::All);
        assert_eq!(state.priority_filter(), None);
        assert_first_page(state);
    }

    /// Assert the completion flag of task `id` within `page`.
    #[track_caller]
    pub fn assert_task_completed(page: &PaginatedResult, id: TaskId, expected: bool) {
        match page.find(id) {
            Some(task) => assert_eq!(
                task.completed, expected,
                "Task {} completed = {}, expected {}",
                id, task.completed, expected
            ),
            None => panic!("Task {} not on page {:?}", id, page),
        }
    }

    /// Assert that a mutation failed validation before reaching the store.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::Validation(_)) => {}
            other => panic!("Expected validation error, got: {:?}", other),
        }
    }

    /// Assert that a mutation was refused for an unchanged field.
    #[track_caller]
    pub fn assert_unchanged<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::Validation(ValidationError::Unchanged { .. })) => {}
            other => panic!("Expected unchanged error, got: {:?}", other),
        }
    }

    /// Assert that a mutation failed at the remote store.
    #[track_caller]
    pub fn assert_remote_error<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::Remote(_)) => {}
            other => panic!("Expected remote error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_scripted_remote_paginates_sorted_results() {
        let remote = ScriptedRemote::seeded(numbered_tasks(45), Vec::new());
        let filter = ApiFilter {
            sort_by: SortBy::CreatedDesc,
            ..ApiFilter::default()
        };

        let page = remote.list_tasks(&filter, 3, 20).await.unwrap();
        assert_eq!(page.total_items, 45);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
        assert!(!page.has_next_page);
        assert_eq!(page.items[0].id, TaskId::new(5));
        assert_eq!(remote.calls(RemoteOp::ListTasks), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_used_once() {
        let remote = ScriptedRemote::seeded(vec![task(1, "a")], Vec::new());
        remote.fail_next(RemoteOp::ToggleTask, RemoteError::transport("offline"));

        assert!(remote.toggle_task_complete(TaskId::new(1)).await.is_err());
        assert!(!remote.task(TaskId::new(1)).unwrap().completed);
        assert!(remote.toggle_task_complete(TaskId::new(1)).await.unwrap().completed);
        assert_eq!(remote.calls(RemoteOp::ToggleTask), 2);
    }

    #[tokio::test]
    async fn test_search_matches_description_case_insensitively() {
        let mut with_description = task(2, "groceries");
        with_description.description = Some("Buy MILK".to_string());
        let remote = ScriptedRemote::seeded(vec![task(1, "report"), with_description], Vec::new());
        let filter = ApiFilter {
            search: Some("milk".to_string()),
            ..ApiFilter::default()
        };
        let page = remote.list_tasks(&filter, 1, 20).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, TaskId::new(2));
    }
}
