//! Paginated result sets as returned by the remote task query.

use crate::{Task, TaskId, ValidationError};
use serde::{Deserialize, Serialize};

/// One page of a remotely filtered and sorted task list.
///
/// Item order is the remote store's order and is never re-sorted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResult {
    pub items: Vec<Task>,
    pub total_items: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginatedResult {
    /// Build a page from its items and the collection totals, deriving the
    /// navigation flags.
    pub fn from_page(items: Vec<Task>, total_items: u64, current_page: u32, page_size: u32) -> Self {
        let total_pages = total_pages_for(total_items, page_size);
        Self {
            items,
            total_items,
            total_pages,
            current_page,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }

    /// An empty first page.
    pub fn empty() -> Self {
        Self::from_page(Vec::new(), 0, 1, 1)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.items.iter().any(|task| task.id == id)
    }

    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.items.iter().find(|task| task.id == id)
    }

    /// Copy of this page with the `completed` flag of task `id` flipped, or
    /// `None` if the page does not hold that task.
    pub fn with_completion_toggled(&self, id: TaskId) -> Option<Self> {
        let position = self.items.iter().position(|task| task.id == id)?;
        let mut page = self.clone();
        page.items[position].completed = !page.items[position].completed;
        Some(page)
    }

    /// Check the structural invariants of a page received for `page_size`.
    pub fn validate(&self, page_size: u32) -> Result<(), ValidationError> {
        if self.current_page == 0 {
            return Err(ValidationError::InvalidPage {
                reason: "current page must be >= 1".to_string(),
            });
        }
        if self.items.len() > page_size as usize {
            return Err(ValidationError::InvalidPage {
                reason: format!(
                    "{} items exceed page size {}",
                    self.items.len(),
                    page_size
                ),
            });
        }
        if self.has_next_page != (self.current_page < self.total_pages) {
            return Err(ValidationError::InvalidPage {
                reason: "hasNextPage disagrees with totalPages".to_string(),
            });
        }
        if self.has_prev_page != (self.current_page > 1) {
            return Err(ValidationError::InvalidPage {
                reason: "hasPrevPage disagrees with currentPage".to_string(),
            });
        }
        Ok(())
    }
}

/// Number of pages needed for `total_items` at `page_size` per page.
pub fn total_pages_for(total_items: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_items.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Entry of a compact pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(u32),
    Ellipsis,
}

/// Compact pager layout: every page when there are at most seven, otherwise
/// the first and last page around a window of the current one.
pub fn page_numbers(current: u32, total: u32) -> Vec<PageLink> {
    use PageLink::{Ellipsis, Page};

    if total <= 7 {
        return (1..=total).map(Page).collect();
    }
    if current <= 3 {
        return vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(total)];
    }
    if current >= total - 2 {
        return vec![
            Page(1),
            Ellipsis,
            Page(total - 3),
            Page(total - 2),
            Page(total - 1),
            Page(total),
        ];
    }
    vec![
        Page(1),
        Ellipsis,
        Page(current - 1),
        Page(current),
        Page(current + 1),
        Ellipsis,
        Page(total),
    ]
}
