//! Taskdeck Core - Entity Types
//!
//! Pure data structures shared by the cache and the client: identifiers,
//! tasks and projects, pagination, filter state, the wire boundary and the
//! error taxonomy. This crate performs no I/O.

pub mod display;
pub mod entities;
pub mod enums;
pub mod error;
pub mod export;
pub mod filter;
pub mod identity;
pub mod pagination;
pub mod wire;

pub use display::{format_due_date, is_overdue};
pub use entities::{
    normalize_display_name, normalize_project_name, Project, Task, TaskDraft, TaskExport,
    MAX_DESCRIPTION_LEN, MAX_DISPLAY_NAME_LEN, MAX_PROJECT_NAME_LEN, MAX_TITLE_LEN,
};
pub use enums::{
    EnumParseError, Priority, SortBy, SortDirection, SortField, StatusFilter, TaskStatus,
    TimeWindow,
};
pub use error::{RemoteError, TaskdeckError, TaskdeckResult, ValidationError, WireError};
pub use export::{to_csv, ExportOutcome, CSV_HEADER};
pub use filter::{ApiFilter, FilterState, FilterUpdate};
pub use identity::{ProjectId, TaskId, Timestamp};
pub use pagination::{page_numbers, total_pages_for, PageLink, PaginatedResult};

/// Page size of the task list when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
