//! Enum types for tasks and view parameters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TASK ENUMS
// ============================================================================

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn all() -> &'static [Priority] {
        &[Priority::High, Priority::Medium, Priority::Low]
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(EnumParseError::new("priority", s)),
        }
    }
}

/// Completion status as understood by the remote query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
}

// ============================================================================
// VIEW PARAMETERS
// ============================================================================

/// Time window selecting which tasks a view covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    All,
    Today,
    Upcoming,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::All => "all",
            TimeWindow::Today => "today",
            TimeWindow::Upcoming => "upcoming",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "all" => Ok(TimeWindow::All),
            "today" => Ok(TimeWindow::Today),
            "upcoming" => Ok(TimeWindow::Upcoming),
            _ => Err(EnumParseError::new("time window", s)),
        }
    }
}

/// Status filter as selected in the UI. `All` is not sent to the remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    /// Projection onto the remote status parameter.
    pub fn as_task_status(&self) -> Option<TaskStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Active => Some(TaskStatus::Active),
            StatusFilter::Completed => Some(TaskStatus::Completed),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            _ => Err(EnumParseError::new("status filter", s)),
        }
    }
}

/// Field a task list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    DueDate,
    Priority,
    Created,
    Alpha,
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One of the eight orderings the remote store understands.
///
/// Serializes to the remote's camelCase names (`dueDateAsc`, ...); displays
/// as the UI token (`dueDate-asc`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    DueDateAsc,
    DueDateDesc,
    PriorityAsc,
    PriorityDesc,
    CreatedAsc,
    CreatedDesc,
    AlphaAsc,
    AlphaDesc,
}

impl SortBy {
    pub fn all() -> &'static [SortBy] {
        &[
            SortBy::DueDateAsc,
            SortBy::DueDateDesc,
            SortBy::PriorityAsc,
            SortBy::PriorityDesc,
            SortBy::CreatedAsc,
            SortBy::CreatedDesc,
            SortBy::AlphaAsc,
            SortBy::AlphaDesc,
        ]
    }

    pub fn from_parts(field: SortField, direction: SortDirection) -> Self {
        match (field, direction) {
            (SortField::DueDate, SortDirection::Asc) => SortBy::DueDateAsc,
            (SortField::DueDate, SortDirection::Desc) => SortBy::DueDateDesc,
            (SortField::Priority, SortDirection::Asc) => SortBy::PriorityAsc,
            (SortField::Priority, SortDirection::Desc) => SortBy::PriorityDesc,
            (SortField::Created, SortDirection::Asc) => SortBy::CreatedAsc,
            (SortField::Created, SortDirection::Desc) => SortBy::CreatedDesc,
            (SortField::Alpha, SortDirection::Asc) => SortBy::AlphaAsc,
            (SortField::Alpha, SortDirection::Desc) => SortBy::AlphaDesc,
        }
    }

    pub fn field(&self) -> SortField {
        match self {
            SortBy::DueDateAsc | SortBy::DueDateDesc => SortField::DueDate,
            SortBy::PriorityAsc | SortBy::PriorityDesc => SortField::Priority,
            SortBy::CreatedAsc | SortBy::CreatedDesc => SortField::Created,
            SortBy::AlphaAsc | SortBy::AlphaDesc => SortField::Alpha,
        }
    }

    pub fn direction(&self) -> SortDirection {
        match self {
            SortBy::DueDateAsc | SortBy::PriorityAsc | SortBy::CreatedAsc | SortBy::AlphaAsc => {
                SortDirection::Asc
            }
            _ => SortDirection::Desc,
        }
    }

    /// UI token, e.g. `priority-desc`.
    pub fn as_token(&self) -> &'static str {
        match self {
            SortBy::DueDateAsc => "dueDate-asc",
            SortBy::DueDateDesc => "dueDate-desc",
            SortBy::PriorityAsc => "priority-asc",
            SortBy::PriorityDesc => "priority-desc",
            SortBy::CreatedAsc => "created-asc",
            SortBy::CreatedDesc => "created-desc",
            SortBy::AlphaAsc => "alpha-asc",
            SortBy::AlphaDesc => "alpha-desc",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

impl FromStr for SortBy {
    type Err = EnumParseError;

    // Accepts both `dueDate-asc` and `dueDateAsc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_token(s);
        SortBy::all()
            .iter()
            .copied()
            .find(|sort| normalize_token(sort.as_token()) == normalized)
            .ok_or_else(|| EnumParseError::new("sort order", s))
    }
}

/// Error when parsing an enum from its textual form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind}: {value}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_parts_round_trip() {
        for sort in SortBy::all() {
            assert_eq!(SortBy::from_parts(sort.field(), sort.direction()), *sort);
        }
    }

    #[test]
    fn test_sort_by_parses_ui_and_wire_tokens() {
        assert_eq!("priority-desc".parse::<SortBy>(), Ok(SortBy::PriorityDesc));
        assert_eq!("alphaAsc".parse::<SortBy>(), Ok(SortBy::AlphaAsc));
        assert!("size-asc".parse::<SortBy>().is_err());
    }

    #[test]
    fn test_sort_by_wire_name() {
        let json = serde_json::to_string(&SortBy::DueDateDesc).unwrap();
        assert_eq!(json, "\"dueDateDesc\"");
    }

    #[test]
    fn test_status_filter_projection() {
        assert_eq!(StatusFilter::All.as_task_status(), None);
        assert_eq!(
            StatusFilter::Completed.as_task_status(),
            Some(TaskStatus::Completed)
        );
    }

    #[test]
    fn test_priority_parse_error_message() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid priority: urgent");
    }
}
