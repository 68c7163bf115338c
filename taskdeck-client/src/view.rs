//! Task view session.
//!
//! [`TaskView`] ties the filter state to the caches: it derives the cache
//! key of the visible page, turns cache entries into render-ready
//! [`ViewSnapshot`]s, debounces search input, keeps the project selection
//! valid across project mutations and queues user notifications.

use crate::coordinator::{MutationCoordinator, ToggleOutcome};
use crate::debounce::Debouncer;
use crate::error::MutationError;
use crate::notifications::{
    Notification, Notifications, FAILED_TO_CREATE_PROJECT, FAILED_TO_CREATE_TASK,
    FAILED_TO_DELETE_PROJECT, FAILED_TO_DELETE_TASK, FAILED_TO_EXPORT_TASKS,
    FAILED_TO_RENAME_PROJECT, FAILED_TO_UPDATE_DISPLAY_NAME, FAILED_TO_UPDATE_TASK,
    NO_TASKS_TO_EXPORT, TASKS_EXPORTED,
};
use crate::persistence::PersistedState;
use std::time::Duration;
use taskdeck_cache::{derive_task_list_key, EntryStatus, TaskListKey};
use taskdeck_core::{
    page_numbers, ExportOutcome, FilterState, FilterUpdate, PageLink, PaginatedResult, Project,
    ProjectId, RemoteError, StatusFilter, Task, TaskDraft, TaskId,
};
use tokio::sync::mpsc;
use tracing::debug;

pub const ALL_TASKS_TITLE: &str = "All Tasks";

/// What an empty task list tells the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// Filters exclude every task.
    NoMatches { offer_clear: bool },
    NoTasksYet,
}

impl EmptyState {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyState::NoMatches { .. } => "No tasks match your filters",
            EmptyState::NoTasksYet => "No tasks yet",
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            EmptyState::NoMatches { .. } => None,
            EmptyState::NoTasksYet => Some("Create a task to get started"),
        }
    }

    pub fn offers_clear_filters(&self) -> bool {
        matches!(self, EmptyState::NoMatches { offer_clear: true })
    }
}

/// Pager state of the visible page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub links: Vec<PageLink>,
}

impl From<&PaginatedResult> for PageInfo {
    fn from(page: &PaginatedResult) -> Self {
        Self {
            current_page: page.current_page,
            total_pages: page.total_pages,
            total_items: page.total_items,
            has_next_page: page.has_next_page,
            has_prev_page: page.has_prev_page,
            links: page_numbers(page.current_page, page.total_pages),
        }
    }
}

/// Everything needed to render the task list once.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub key: TaskListKey,
    pub status: EntryStatus,
    /// No data yet and a fetch is in flight.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
    /// Draw a divider between the active and completed groups.
    pub show_separator: bool,
    /// Present when the result spans more than one page.
    pub pagination: Option<PageInfo>,
    pub empty_state: Option<EmptyState>,
    /// Error of the last fetch. Data, if any, is the last known good page.
    pub last_error: Option<RemoteError>,
}

impl ViewSnapshot {
    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export works on the whole filtered set but is offered only when the
    /// visible page has tasks.
    pub fn export_enabled(&self) -> bool {
        !self.is_empty()
    }
}

/// Split a page into active then completed tasks, keeping remote order
/// within each group.
fn partition(items: &[Task], status_filter: StatusFilter) -> (Vec<Task>, Vec<Task>, bool) {
    let (completed, active): (Vec<Task>, Vec<Task>) =
        items.iter().cloned().partition(|task| task.completed);
    let show_separator =
        status_filter == StatusFilter::All && !active.is_empty() && !completed.is_empty();
    (active, completed, show_separator)
}

pub struct TaskView {
    coordinator: MutationCoordinator,
    filters: FilterState,
    page_size: u32,
    search: Debouncer<String>,
    settled_search: mpsc::UnboundedReceiver<String>,
    notifications: Notifications,
    /// Inline message of the last failed form submission.
    form_error: Option<String>,
}

impl TaskView {
    /// Must be created within a Tokio runtime.
    pub fn new(coordinator: MutationCoordinator, page_size: u32, search_debounce: Duration) -> Self {
        let (search, settled_search) = Debouncer::new(search_debounce, String::new());
        Self {
            coordinator,
            filters: FilterState::new(),
            page_size,
            search,
            settled_search,
            notifications: Notifications::default(),
            form_error: None,
        }
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    /// Message to show inside the form whose submission failed. The form
    /// stays open with its input until a submission succeeds.
    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn dismiss_form_error(&mut self) {
        self.form_error = None;
    }

    fn record_form<T>(
        &mut self,
        result: Result<T, MutationError>,
        fallback: &str,
    ) -> Result<T, MutationError> {
        self.form_error = result.as_ref().err().map(|err| err.inline_message(fallback));
        result
    }

    /// Apply a filter change immediately. Search text set this way bypasses
    /// the debounce and replaces the pending input.
    pub fn update(&mut self, update: FilterUpdate) {
        match &update {
            FilterUpdate::Search(query) => self.search.reset(query.clone()),
            FilterUpdate::Clear => self.search.reset(String::new()),
            _ => {}
        }
        self.filters.apply(update);
    }

    pub fn select_project(&mut self, project_id: Option<ProjectId>) {
        self.update(FilterUpdate::Project(project_id));
    }

    pub fn clear_filters(&mut self) {
        self.update(FilterUpdate::Clear);
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Record a keystroke. The filter follows once typing pauses.
    pub fn type_search(&mut self, text: impl Into<String>) {
        self.search.input(text.into());
    }

    /// Text shown in the search field, which may be ahead of the filter.
    pub fn search_text(&self) -> &str {
        self.search.value()
    }

    /// Apply the latest settled search value, if one arrived. Returns whether
    /// the filter was updated.
    pub fn apply_settled_search(&mut self) -> bool {
        let mut latest = None;
        while let Ok(value) = self.settled_search.try_recv() {
            latest = Some(value);
        }
        match latest {
            Some(query) => {
                self.filters.set_search_query(query);
                true
            }
            None => false,
        }
    }

    /// Wait for typing to pause, then apply the search text.
    ///
    /// Waits indefinitely if no search input is pending.
    pub async fn settle_search(&mut self) {
        if let Some(query) = self.settled_search.recv().await {
            debug!(query = %query, "Search settled");
            self.filters.set_search_query(query);
        }
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    pub fn current_key(&self) -> TaskListKey {
        derive_task_list_key(
            &self.filters.api_filter(),
            self.filters.current_page(),
            self.page_size,
        )
    }

    /// Render state of the visible page. Starts a fetch when the page is
    /// missing or stale; previously fetched data stays visible meanwhile.
    pub fn snapshot(&self) -> ViewSnapshot {
        let key = self.current_key();
        let entry = self.coordinator.caches().tasks.read(&key);
        let is_loading = entry.is_loading();

        let (active, completed, show_separator, pagination) = match entry.value() {
            Some(page) => {
                let (active, completed, separator) =
                    partition(&page.items, self.filters.status_filter());
                let pagination = (page.total_pages > 1).then(|| PageInfo::from(page));
                (active, completed, separator, pagination)
            }
            None => (Vec::new(), Vec::new(), false, None),
        };

        let empty_state = (!is_loading && active.is_empty() && completed.is_empty()).then(|| {
            if self.filters.has_active_filters() {
                EmptyState::NoMatches { offer_clear: true }
            } else {
                EmptyState::NoTasksYet
            }
        });

        ViewSnapshot {
            key,
            status: entry.status,
            is_loading,
            is_fetching: entry.is_fetching,
            active,
            completed,
            show_separator,
            pagination,
            empty_state,
            last_error: entry.last_error,
        }
    }

    /// Wait for the visible page to be fetched, then snapshot it. A failed
    /// fetch is reported through [`ViewSnapshot::last_error`].
    pub async fn load(&self) -> ViewSnapshot {
        let key = self.current_key();
        if let Err(err) = self.coordinator.tasks(&key).await {
            debug!(key = ?key, error = %err, "Task list load did not complete");
        }
        self.snapshot()
    }

    /// Title of the list: the selected project's name, or "All Tasks".
    pub fn view_title(&self, projects: &[Project]) -> String {
        self.filters
            .project_id()
            .and_then(|id| projects.iter().find(|p| p.id == id))
            .map(|project| project.name.clone())
            .unwrap_or_else(|| ALL_TASKS_TITLE.to_string())
    }

    // ------------------------------------------------------------------------
    // Task mutations
    // ------------------------------------------------------------------------

    pub async fn create_task(&mut self, draft: &TaskDraft) -> Result<Task, MutationError> {
        let result = self.coordinator.create_task(draft).await;
        self.record_form(result, FAILED_TO_CREATE_TASK)
    }

    pub async fn update_task(&mut self, id: TaskId, draft: &TaskDraft) -> Result<Task, MutationError> {
        let result = self.coordinator.update_task(id, draft).await;
        self.record_form(result, FAILED_TO_UPDATE_TASK)
    }

    pub async fn delete_task(&mut self, id: TaskId) -> Result<(), MutationError> {
        let result = self.coordinator.delete_task(id).await;
        if result.is_err() {
            self.notifications.push(Notification::error(FAILED_TO_DELETE_TASK));
        }
        result
    }

    /// Toggle completion, announcing the change at once and reporting a
    /// failure once the store refuses.
    pub async fn toggle_complete(&mut self, id: TaskId) -> Result<ToggleOutcome, MutationError> {
        let handle = self.coordinator.begin_toggle(id);
        if let Some(now_completed) = handle.optimistic_completed() {
            self.notifications
                .push(Notification::toggle_issued(now_completed));
        }

        let result = handle.wait().await;
        if result.is_err() {
            self.notifications.push(Notification::error(FAILED_TO_UPDATE_TASK));
        }
        result
    }

    /// Export every task matching the current filters.
    pub async fn export(&mut self) -> Result<ExportOutcome, MutationError> {
        let result = self
            .coordinator
            .export_tasks(&self.filters.api_filter())
            .await;
        match &result {
            Ok(ExportOutcome::Empty) => self.notifications.push(Notification::error(NO_TASKS_TO_EXPORT)),
            Ok(ExportOutcome::Csv { .. }) => self.notifications.push(Notification::success(TASKS_EXPORTED)),
            Err(_) => self.notifications.push(Notification::error(FAILED_TO_EXPORT_TASKS)),
        }
        result
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    /// Create a project and select it.
    pub async fn create_project(&mut self, name: &str) -> Result<Project, MutationError> {
        let result = self.coordinator.create_project(name).await;
        let project = self.record_form(result, FAILED_TO_CREATE_PROJECT)?;
        self.select_project(Some(project.id));
        Ok(project)
    }

    pub async fn rename_project(&mut self, id: ProjectId, name: &str) -> Result<Project, MutationError> {
        let result = self.coordinator.rename_project(id, name).await;
        self.record_form(result, FAILED_TO_RENAME_PROJECT)
    }

    /// Delete a project. Deleting the selected project falls back to all
    /// tasks so the next read is not scoped to the deleted id.
    pub async fn delete_project(&mut self, id: ProjectId) -> Result<(), MutationError> {
        match self.coordinator.delete_project(id).await {
            Ok(()) => {
                if self.filters.project_id() == Some(id) {
                    self.select_project(None);
                }
                Ok(())
            }
            Err(err) => {
                self.notifications
                    .push(Notification::error(err.inline_message(FAILED_TO_DELETE_PROJECT)));
                Err(err)
            }
        }
    }

    /// Clear a selection that no longer names a known project.
    pub fn reconcile_selection(&mut self, projects: &[Project]) -> bool {
        match self.filters.project_id() {
            Some(id) if !projects.iter().any(|p| p.id == id) => {
                debug!(project_id = %id, "Selected project no longer exists");
                self.select_project(None);
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    pub async fn set_display_name(&mut self, name: &str) -> Result<(), MutationError> {
        let result = self.coordinator.set_display_name(name).await;
        self.record_form(result, FAILED_TO_UPDATE_DISPLAY_NAME)
    }

    pub fn preferences(&self) -> PersistedState {
        PersistedState {
            sort_by: self.filters.sort_by(),
            selected_project_id: self.filters.project_id(),
        }
    }

    /// Restore saved preferences through the ordinary setters.
    pub fn restore_preferences(&mut self, state: &PersistedState) {
        self.update(FilterUpdate::Sort(state.sort_by));
        self.update(FilterUpdate::Project(state.selected_project_id));
    }

    /// Drop all cached data and pending input for the signed-out identity.
    pub fn sign_out(&mut self) {
        self.search.cancel();
        self.coordinator.sign_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, completed: bool) -> Task {
        let at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Task {
            id: TaskId::new(id),
            title: format!("task {id}"),
            description: None,
            due_date: None,
            priority: taskdeck_core::Priority::Medium,
            project_id: None,
            completed,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_partition_keeps_remote_order_within_groups() {
        let items = vec![task(1, true), task(2, false), task(3, true), task(4, false)];
        let (active, completed, separator) = partition(&items, StatusFilter::All);
        let ids = |tasks: &[Task]| tasks.iter().map(|t| t.id.get()).collect::<Vec<_>>();
        assert_eq!(ids(&active), vec![2, 4]);
        assert_eq!(ids(&completed), vec![1, 3]);
        assert!(separator);
    }

    #[test]
    fn test_separator_needs_both_groups_and_all_status() {
        let mixed = vec![task(1, true), task(2, false)];
        assert!(!partition(&mixed, StatusFilter::Active).2);

        let only_active = vec![task(1, false)];
        assert!(!partition(&only_active, StatusFilter::All).2);
    }

    #[test]
    fn test_empty_state_texts() {
        let no_matches = EmptyState::NoMatches { offer_clear: true };
        assert_eq!(no_matches.message(), "No tasks match your filters");
        assert!(no_matches.offers_clear_filters());
        assert_eq!(no_matches.hint(), None);

        assert_eq!(EmptyState::NoTasksYet.message(), "No tasks yet");
        assert!(!EmptyState::NoTasksYet.offers_clear_filters());
        assert_eq!(EmptyState::NoTasksYet.hint(), Some("Create a task to get started"));
    }
}
