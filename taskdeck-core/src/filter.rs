//! Filter state for the task list view.
//!
//! [`FilterState`] holds every view parameter of the task list. All setters
//! except [`FilterState::set_current_page`] move the view back to page 1 in
//! the same `&mut self` call, so no caller can ever observe a new filter
//! paired with an old page number.

use crate::{Priority, ProjectId, SortBy, StatusFilter, TaskStatus, TimeWindow};
use serde::{Deserialize, Serialize};

/// Current view parameters of the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    time_window: TimeWindow,
    project_id: Option<ProjectId>,
    search_query: String,
    priority_filter: Option<Priority>,
    status_filter: StatusFilter,
    sort_by: SortBy,
    current_page: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            time_window: TimeWindow::All,
            project_id: None,
            search_query: String::new(),
            priority_filter: None,
            status_filter: StatusFilter::All,
            sort_by: SortBy::default(),
            current_page: 1,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_window(&self) -> TimeWindow {
        self.time_window
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn priority_filter(&self) -> Option<Priority> {
        self.priority_filter
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn set_time_window(&mut self, time_window: TimeWindow) {
        self.time_window = time_window;
        self.current_page = 1;
    }

    pub fn set_project_id(&mut self, project_id: Option<ProjectId>) {
        self.project_id = project_id;
        self.current_page = 1;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.current_page = 1;
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.priority_filter = priority;
        self.current_page = 1;
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.status_filter = status;
        self.current_page = 1;
    }

    /// Reordering changes which items land on which page, so this resets the
    /// page as well.
    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.sort_by = sort_by;
        self.current_page = 1;
    }

    /// The only setter that keeps the other parameters' page binding. Page 0
    /// is clamped to 1.
    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    /// Apply one [`FilterUpdate`].
    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::TimeWindow(window) => self.set_time_window(window),
            FilterUpdate::Project(project_id) => self.set_project_id(project_id),
            FilterUpdate::Search(query) => self.set_search_query(query),
            FilterUpdate::Priority(priority) => self.set_priority_filter(priority),
            FilterUpdate::Status(status) => self.set_status_filter(status),
            FilterUpdate::Sort(sort_by) => self.set_sort_by(sort_by),
            FilterUpdate::Page(page) => self.set_current_page(page),
            FilterUpdate::Clear => self.clear_filters(),
        }
    }

    /// Reset time window, search, status, priority and page together.
    ///
    /// Sort order and project selection are navigation, not filters, and are
    /// left alone.
    pub fn clear_filters(&mut self) {
        self.time_window = TimeWindow::All;
        self.search_query.clear();
        self.status_filter = StatusFilter::All;
        self.priority_filter = None;
        self.current_page = 1;
    }

    /// Whether any user-facing filter narrows the list. Project and time
    /// window do not count.
    pub fn has_active_filters(&self) -> bool {
        !self.search_query.trim().is_empty()
            || self.status_filter != StatusFilter::All
            || self.priority_filter.is_some()
    }

    /// Normalized projection sent to the remote query.
    ///
    /// Search text is trimmed and dropped when empty and `StatusFilter::All`
    /// becomes `None`, so view states that query the same thing project to
    /// equal values.
    pub fn api_filter(&self) -> ApiFilter {
        let search = self.search_query.trim();
        ApiFilter {
            view: self.time_window,
            project_id: self.project_id,
            priority: self.priority_filter,
            status: self.status_filter.as_task_status(),
            search: (!search.is_empty()).then(|| search.to_string()),
            sort_by: self.sort_by,
        }
    }
}

/// A single change to the filter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    TimeWindow(TimeWindow),
    Project(Option<ProjectId>),
    Search(String),
    Priority(Option<Priority>),
    Status(StatusFilter),
    Sort(SortBy),
    Page(u32),
    Clear,
}

impl FilterUpdate {
    /// Whether this update only navigates between pages of the same query.
    pub fn is_page_change(&self) -> bool {
        matches!(self, FilterUpdate::Page(_))
    }
}

/// Filter parameters of a remote task query, without pagination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiFilter {
    pub view: TimeWindow,
    pub project_id: Option<ProjectId>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
    pub sort_by: SortBy,
}

impl Default for ApiFilter {
    fn default() -> Self {
        FilterState::default().api_filter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_page_three() -> FilterState {
        let mut state = FilterState::new();
        state.set_current_page(3);
        state
    }

    #[test]
    fn test_every_filter_setter_resets_page() {
        let mut state = on_page_three();
        state.set_time_window(TimeWindow::Today);
        assert_eq!(state.current_page(), 1);

        let mut state = on_page_three();
        state.set_project_id(Some(ProjectId::new(4)));
        assert_eq!(state.current_page(), 1);

        let mut state = on_page_three();
        state.set_search_query("milk");
        assert_eq!(state.current_page(), 1);

        let mut state = on_page_three();
        state.set_priority_filter(Some(Priority::High));
        assert_eq!(state.current_page(), 1);

        let mut state = on_page_three();
        state.set_status_filter(StatusFilter::Active);
        assert_eq!(state.current_page(), 1);

        let mut state = on_page_three();
        state.set_sort_by(SortBy::AlphaDesc);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn test_page_zero_clamps_to_one() {
        let mut state = FilterState::new();
        state.set_current_page(0);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn test_clear_keeps_sort_and_project() {
        let mut state = FilterState::new();
        state.set_sort_by(SortBy::PriorityDesc);
        state.set_project_id(Some(ProjectId::new(9)));
        state.set_time_window(TimeWindow::Upcoming);
        state.set_search_query("report");
        state.set_status_filter(StatusFilter::Completed);
        state.set_priority_filter(Some(Priority::Low));
        state.set_current_page(4);

        state.clear_filters();

        assert_eq!(state.time_window(), TimeWindow::All);
        assert_eq!(state.search_query(), "");
        assert_eq!(state.status_filter(), StatusFilter::All);
        assert_eq!(state.priority_filter(), None);
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.sort_by(), SortBy::PriorityDesc);
        assert_eq!(state.project_id(), Some(ProjectId::new(9)));
    }

    #[test]
    fn test_has_active_filters_ignores_navigation() {
        let mut state = FilterState::new();
        state.set_project_id(Some(ProjectId::new(1)));
        state.set_time_window(TimeWindow::Today);
        state.set_sort_by(SortBy::CreatedDesc);
        assert!(!state.has_active_filters());

        state.set_search_query("   ");
        assert!(!state.has_active_filters());

        state.set_priority_filter(Some(Priority::Medium));
        assert!(state.has_active_filters());
    }

    #[test]
    fn test_api_filter_normalizes_search_and_status() {
        let mut a = FilterState::new();
        a.set_search_query("  milk ");
        let mut b = FilterState::new();
        b.set_search_query("milk");
        assert_eq!(a.api_filter(), b.api_filter());

        let blank = FilterState::new().api_filter();
        assert_eq!(blank.search, None);
        assert_eq!(blank.status, None);
    }
}
